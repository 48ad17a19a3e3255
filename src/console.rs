//! The admin console: session admission, routing and the two workspaces.
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, PopupMode};
use crate::error::{AuthError, FetchError, FieldError, GatewayError, MutationError, SubmitError, UploadError};
use crate::filter::Page;
use crate::gateway::{Gateway, GatewayClient};
use crate::model::{JobPosting, PopupConfig, Resource, ResourceId};
use crate::notify::Notifier;
use crate::session::{Credentials, FileTokenStore, SessionGuard, TokenStore, View};
use crate::store::{Cardinality, MutationReport};
use crate::upload::{CloudinaryUploader, ImageFile, MediaUploader};
use crate::workspace::Workspace;

#[derive(Debug)]
pub struct Workspaces {
    pub jobs: Workspace<JobPosting>,
    pub popups: Workspace<PopupConfig>,
}

/// A resource with its own view and workspace in the console.
pub trait Managed: Resource {
    const VIEW: View;
    fn workspace(ws: &Workspaces) -> &Workspace<Self>;
    fn workspace_mut(ws: &mut Workspaces) -> &mut Workspace<Self>;
}

impl Managed for JobPosting {
    const VIEW: View = View::Jobs;
    fn workspace(ws: &Workspaces) -> &Workspace<Self> {
        &ws.jobs
    }
    fn workspace_mut(ws: &mut Workspaces) -> &mut Workspace<Self> {
        &mut ws.jobs
    }
}

impl Managed for PopupConfig {
    const VIEW: View = View::Popups;
    fn workspace(ws: &Workspaces) -> &Workspace<Self> {
        &ws.popups
    }
    fn workspace_mut(ws: &mut Workspaces) -> &mut Workspace<Self> {
        &mut ws.popups
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConsoleSettings {
    pub page_size: usize,
    pub popup_mode: PopupMode,
}

pub struct Console {
    guard: SessionGuard,
    gateway: Arc<dyn Gateway>,
    uploader: Arc<dyn MediaUploader>,
    notifier: Notifier,
    workspaces: Workspaces,
    view: View,
}

impl Console {
    pub fn new(
        guard: SessionGuard,
        gateway: Arc<dyn Gateway>,
        uploader: Arc<dyn MediaUploader>,
        notifier: Notifier,
        settings: ConsoleSettings,
    ) -> Self {
        let popup_cardinality = match settings.popup_mode {
            PopupMode::Single => Cardinality::Single,
            PopupMode::List => Cardinality::List,
        };
        Self {
            guard,
            gateway,
            uploader,
            notifier,
            workspaces: Workspaces {
                jobs: Workspace::new(Cardinality::List, settings.page_size),
                popups: Workspace::new(popup_cardinality, settings.page_size),
            },
            view: View::Login,
        }
    }

    /// Wire the real gateway, media host and token file from configuration.
    pub fn from_config(cfg: &Config) -> Result<Self, GatewayError> {
        let store: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::at(cfg.token_path()));
        Ok(Self::new(
            SessionGuard::new(store),
            Arc::new(GatewayClient::from_config(cfg)?),
            Arc::new(CloudinaryUploader::from_config(cfg)?),
            Notifier::new(cfg.notification_ttl()),
            ConsoleSettings {
                page_size: cfg.app.page_size,
                popup_mode: cfg.app.popup_mode,
            },
        ))
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_authenticated(&self) -> bool {
        self.guard.is_authenticated()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn workspace<R: Managed>(&self) -> &Workspace<R> {
        R::workspace(&self.workspaces)
    }

    pub fn page<R: Managed>(&self) -> Page<'_, R> {
        self.workspace::<R>().page()
    }

    /// Mount `requested`, subject to admission. Leaving a view discards its
    /// draft; entering a gated view refreshes its collection.
    pub async fn navigate(&mut self, requested: View) -> View {
        let target = self.guard.admit(requested);
        if target != requested {
            info!(?requested, ?target, "redirected");
        }
        if target != self.view {
            self.discard_draft_of(self.view);
        }
        self.view = target;

        let result = match target {
            View::Jobs => self.refresh::<JobPosting>().await.map(drop),
            View::Popups => self.refresh::<PopupConfig>().await.map(drop),
            View::Login => Ok(()),
        };
        if let Err(err) = result {
            warn!(%err, "initial fetch failed");
        }
        self.view
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<View, AuthError> {
        if let Err(err) = self.guard.login(&*self.gateway, credentials).await {
            warn!(%err, "login failed");
            self.notifier.error(err.to_string());
            return Err(err);
        }
        self.notifier.info("Logged in");
        Ok(self.navigate(View::Jobs).await)
    }

    /// Sign out without contacting the gateway.
    pub fn logout(&mut self) -> View {
        self.sign_out();
        self.notifier.info("Logged out");
        self.view
    }

    fn sign_out(&mut self) {
        if let Err(err) = self.guard.logout() {
            warn!(%err, "failed to clear session token");
        }
        self.workspaces.jobs.reset();
        self.workspaces.popups.reset();
        self.view = View::Login;
    }

    // An auth failure reported by the gateway ends the session.
    fn check_session(&mut self, auth_failure: bool) {
        if auth_failure {
            warn!("gateway rejected the session; signing out");
            self.sign_out();
            self.notifier.error(AuthError::SessionExpired.to_string());
        }
    }

    fn discard_draft_of(&mut self, view: View) {
        match view {
            View::Jobs => self.workspaces.jobs.discard_draft(),
            View::Popups => self.workspaces.popups.discard_draft(),
            View::Login => {}
        }
    }

    pub async fn refresh<R: Managed>(&mut self) -> Result<usize, FetchError> {
        let session = self.guard.context();
        let result = R::workspace_mut(&mut self.workspaces)
            .refresh(&*self.gateway, &session, &self.notifier)
            .await;
        self.check_session(result.as_ref().err().map_or(false, FetchError::is_auth_failure));
        result
    }

    pub fn set_field<R: Managed>(&mut self, name: &str, value: impl Into<String>) -> Result<(), FieldError> {
        R::workspace_mut(&mut self.workspaces).set_field(name, value)
    }

    pub fn begin_edit<R: Managed>(&mut self, id: &ResourceId) -> bool {
        R::workspace_mut(&mut self.workspaces).begin_edit(id)
    }

    pub fn cancel<R: Managed>(&mut self) {
        R::workspace_mut(&mut self.workspaces).discard_draft();
    }

    pub fn set_query<R: Managed>(&mut self, field: &str, value: impl Into<String>) -> Result<(), FieldError> {
        R::workspace_mut(&mut self.workspaces).set_query(field, value)
    }

    pub fn clear_query<R: Managed>(&mut self) {
        R::workspace_mut(&mut self.workspaces).clear_query();
    }

    pub fn go_to_page<R: Managed>(&mut self, page: usize) -> usize {
        R::workspace_mut(&mut self.workspaces).go_to_page(page)
    }

    pub async fn submit<R: Managed>(&mut self) -> Result<MutationReport, SubmitError> {
        let session = self.guard.context();
        let result = R::workspace_mut(&mut self.workspaces)
            .submit(&*self.gateway, &session, &self.notifier)
            .await;
        let auth_failure = match &result {
            Ok(report) => report.refresh.as_ref().err().map_or(false, FetchError::is_auth_failure),
            Err(err) => err.is_auth_failure(),
        };
        self.check_session(auth_failure);
        result
    }

    pub async fn delete<R: Managed>(&mut self, id: &ResourceId) -> Result<MutationReport, MutationError> {
        let session = self.guard.context();
        let result = R::workspace_mut(&mut self.workspaces)
            .delete(id, &*self.gateway, &session, &self.notifier)
            .await;
        let auth_failure = match &result {
            Ok(report) => report.refresh.as_ref().err().map_or(false, FetchError::is_auth_failure),
            Err(err) => err.is_auth_failure(),
        };
        self.check_session(auth_failure);
        result
    }

    pub async fn upload_image<R: Managed>(&mut self, file: &ImageFile) -> Result<Option<String>, UploadError> {
        R::workspace_mut(&mut self.workspaces)
            .upload_image(&*self.uploader, file, &self.notifier)
            .await
    }
}
