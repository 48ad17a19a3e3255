//! Create/edit form state for one resource type.
use tracing::{info, instrument, warn};

use crate::error::{FieldError, MutationError, SubmitError, UploadError, ValidationError};
use crate::gateway::Gateway;
use crate::model::{Resource, ResourceId};
use crate::notify::{self, Notifier};
use crate::session::SessionContext;
use crate::store::{MutationReport, ResourceStore};
use crate::upload::{ImageFile, MediaUploader, UploadSlot, UploadTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(ResourceId),
}

/// The single draft being created or edited.
///
/// Every discard of the draft bumps `generation`, which is how late upload
/// results are told apart from ones meant for the current draft.
#[derive(Debug)]
pub struct FormController<R> {
    draft: R,
    editing_id: Option<ResourceId>,
    generation: u64,
    uploads: UploadSlot,
}

impl<R: Resource> Default for FormController<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> FormController<R> {
    pub fn new() -> Self {
        Self {
            draft: R::default(),
            editing_id: None,
            generation: 0,
            uploads: UploadSlot::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        match &self.editing_id {
            Some(id) => FormMode::Edit(id.clone()),
            None => FormMode::Create,
        }
    }

    pub fn editing_id(&self) -> Option<&ResourceId> {
        self.editing_id.as_ref()
    }

    pub fn draft(&self) -> &R {
        &self.draft
    }

    /// True when the draft differs from the empty create-mode default.
    pub fn is_dirty(&self) -> bool {
        self.editing_id.is_some()
            || R::FIELDS
                .iter()
                .any(|f| self.draft.field(f).map_or(false, |v| !v.is_empty()))
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads.is_busy()
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FieldError> {
        self.draft.set_field(name, value.into())
    }

    /// Load `record` into the draft and switch to edit mode. Records without
    /// an id cannot be edited.
    pub fn begin_edit(&mut self, record: &R) -> bool {
        let Some(id) = record.id().cloned() else {
            warn!("cannot edit a record without an id");
            return false;
        };
        self.discard();
        self.draft = record.clone();
        self.editing_id = Some(id);
        true
    }

    /// Drop the draft and return to create mode.
    pub fn cancel(&mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        self.draft = R::default();
        self.editing_id = None;
        self.generation += 1;
        self.uploads.reset();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.draft.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    /// Validate, then create or update depending on the mode.
    ///
    /// On success the draft is reset; on any failure it is left untouched.
    #[instrument(skip_all, fields(kind = R::KIND.as_str()))]
    pub async fn submit(
        &mut self,
        store: &mut ResourceStore<R>,
        gateway: &dyn Gateway,
        session: &SessionContext,
        notifier: &Notifier,
    ) -> Result<MutationReport, SubmitError> {
        if let Err(err) = self.validate() {
            warn!(missing = ?err.missing, "submit rejected");
            notifier.error(err.to_string());
            return Err(err.into());
        }

        let editing = self.editing_id.clone();
        let result = match &editing {
            Some(id) => store.update(id, &self.draft, gateway, session).await,
            None => store.create(&self.draft, gateway, session).await,
        };

        match result {
            Ok(report) => {
                self.discard();
                let verb = if editing.is_some() { "updated" } else { "added" };
                info!(verb, "submit succeeded");
                announce::<R>(notifier, verb, &report);
                Ok(report)
            }
            Err(err) => {
                warn!(%err, "submit failed; keeping draft");
                notifier.error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Delete a record. If it is the one being edited, the form returns to
    /// create mode once the follow-up refresh has completed.
    #[instrument(skip_all, fields(kind = R::KIND.as_str(), %id))]
    pub async fn delete(
        &mut self,
        id: &ResourceId,
        store: &mut ResourceStore<R>,
        gateway: &dyn Gateway,
        session: &SessionContext,
        notifier: &Notifier,
    ) -> Result<MutationReport, MutationError> {
        match store.delete(id, gateway, session).await {
            Ok(report) => {
                if self.editing_id.as_ref() == Some(id) {
                    self.discard();
                }
                announce::<R>(notifier, "deleted", &report);
                Ok(report)
            }
            Err(err) => {
                warn!(%err, "delete failed");
                notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    /// Reserve the upload slot for the current draft.
    pub fn begin_upload(&mut self) -> Result<UploadTicket, UploadError> {
        self.uploads.begin(self.generation)
    }

    /// Apply an upload result. The image field changes only on success and
    /// only if the draft the upload was started for is still open.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<String, UploadError>,
        notifier: &Notifier,
    ) -> Result<Option<String>, UploadError> {
        let current = self.uploads.finish(ticket, self.generation);
        match result {
            Ok(url) if current => {
                if let Err(err) = self.draft.set_field(R::IMAGE_FIELD, url.clone()) {
                    warn!(%err, "image field missing on resource");
                }
                notifier.info("Image uploaded");
                Ok(Some(url))
            }
            Ok(url) => {
                info!(%url, "draft was discarded; dropping uploaded image");
                Ok(None)
            }
            Err(err) => {
                warn!(%err, "image upload failed");
                notifier.error(err.to_string());
                Err(err)
            }
        }
    }

    /// Upload `file` and store the hosted URL in the draft's image field.
    pub async fn upload_image(
        &mut self,
        uploader: &dyn MediaUploader,
        file: &ImageFile,
        notifier: &Notifier,
    ) -> Result<Option<String>, UploadError> {
        let ticket = match self.begin_upload() {
            Ok(ticket) => ticket,
            Err(err) => {
                notifier.error(err.to_string());
                return Err(err);
            }
        };
        let result = uploader.upload(file).await;
        self.finish_upload(ticket, result, notifier)
    }
}

// The slot shows one message, so a failed follow-up refresh rides along with
// the success text instead of replacing it.
fn announce<R: Resource>(notifier: &Notifier, verb: &str, report: &MutationReport) {
    let done = format!("{} {} successfully!", R::KIND.label(), verb);
    match &report.refresh {
        Ok(_) => notifier.info(done),
        Err(_) => notifier.error(format!("{} {}", done, notify::fetch_failed(R::KIND))),
    }
}
