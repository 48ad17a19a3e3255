use tracing::info;

use crate::error::{FetchError, FieldError, MutationError, SubmitError, UploadError};
use crate::filter::{FilterEngine, Page};
use crate::form::FormController;
use crate::gateway::Gateway;
use crate::model::{Resource, ResourceId};
use crate::notify::{self, Notifier};
use crate::session::SessionContext;
use crate::store::{Cardinality, MutationReport, ResourceStore};
use crate::upload::{ImageFile, MediaUploader};

/// Everything the console keeps for one resource type.
#[derive(Debug)]
pub struct Workspace<R> {
    store: ResourceStore<R>,
    filter: FilterEngine<R>,
    form: FormController<R>,
}

impl<R: Resource> Workspace<R> {
    pub fn new(cardinality: Cardinality, page_size: usize) -> Self {
        Self {
            store: ResourceStore::new(cardinality),
            filter: FilterEngine::new(page_size),
            form: FormController::new(),
        }
    }

    pub fn store(&self) -> &ResourceStore<R> {
        &self.store
    }

    pub fn filter(&self) -> &FilterEngine<R> {
        &self.filter
    }

    pub fn form(&self) -> &FormController<R> {
        &self.form
    }

    pub fn page(&self) -> Page<'_, R> {
        self.filter.page(self.store.items())
    }

    pub fn set_query(&mut self, field: &str, value: impl Into<String>) -> Result<(), FieldError> {
        self.filter.set_query(field, value)
    }

    pub fn clear_query(&mut self) {
        self.filter.clear_query();
    }

    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.filter.go_to_page(page, self.store.items())
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FieldError> {
        self.form.set_field(name, value)
    }

    /// Start editing the stored record with `id`.
    pub fn begin_edit(&mut self, id: &ResourceId) -> bool {
        match self.store.get(id) {
            Some(record) => self.form.begin_edit(record),
            None => false,
        }
    }

    /// Drop the records and the draft at the end of a session.
    pub fn reset(&mut self) {
        self.store.clear();
        self.filter.clear_query();
        self.form.cancel();
    }

    pub fn discard_draft(&mut self) {
        self.form.cancel();
        self.load_single();
    }

    pub async fn refresh(
        &mut self,
        gateway: &dyn Gateway,
        session: &SessionContext,
        notifier: &Notifier,
    ) -> Result<usize, FetchError> {
        let result = self.store.refresh(gateway, session).await;
        if result.is_err() {
            notifier.error(notify::fetch_failed(R::KIND));
        }
        self.load_single();
        result
    }

    pub async fn submit(
        &mut self,
        gateway: &dyn Gateway,
        session: &SessionContext,
        notifier: &Notifier,
    ) -> Result<MutationReport, SubmitError> {
        let result = self
            .form
            .submit(&mut self.store, gateway, session, notifier)
            .await;
        self.load_single();
        result
    }

    pub async fn delete(
        &mut self,
        id: &ResourceId,
        gateway: &dyn Gateway,
        session: &SessionContext,
        notifier: &Notifier,
    ) -> Result<MutationReport, MutationError> {
        let result = self
            .form
            .delete(id, &mut self.store, gateway, session, notifier)
            .await;
        self.load_single();
        result
    }

    pub async fn upload_image(
        &mut self,
        uploader: &dyn MediaUploader,
        file: &ImageFile,
        notifier: &Notifier,
    ) -> Result<Option<String>, UploadError> {
        self.form.upload_image(uploader, file, notifier).await
    }

    // In single-record mode the form always shows the existing record.
    fn load_single(&mut self) {
        if self.store.cardinality() != Cardinality::Single || self.form.is_dirty() {
            return;
        }
        if let Some(record) = self.store.items().first() {
            info!(kind = R::KIND.as_str(), "loading the single record into the form");
            self.form.begin_edit(record);
        }
    }
}
