use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{GatewayError, UploadError};

/// One image selected by the operator.
#[derive(Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageFile {
    /// Read an image from disk. Files without an image extension are refused
    /// before anything is read.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::NotAnImage(path.display().to_string()))?
            .to_string();
        let content_type = image_content_type(path)
            .ok_or_else(|| UploadError::NotAnImage(file_name.clone()))?;
        let bytes = fs::read(path).await?;
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

pub fn image_content_type(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" || ext == "jpeg" => Some("image/jpeg"),
        Some(ext) if ext == "png" => Some("image/png"),
        Some(ext) if ext == "gif" => Some("image/gif"),
        Some(ext) if ext == "webp" => Some("image/webp"),
        Some(ext) if ext == "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// External media host that turns an image into a stable URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, file: &ImageFile) -> Result<String, UploadError>;
}

#[derive(Clone)]
pub struct CloudinaryUploader {
    http: Client,
    upload_url: Url,
    upload_preset: String,
    cloud_name: String,
}

impl fmt::Debug for CloudinaryUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryUploader")
            .field("upload_url", &self.upload_url)
            .field("cloud_name", &self.cloud_name)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(
        upload_url: Url,
        upload_preset: String,
        cloud_name: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            upload_url,
            upload_preset,
            cloud_name,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, GatewayError> {
        let url = Url::parse(&cfg.media.upload_url)
            .map_err(|err| GatewayError::InvalidUrl(err.to_string()))?;
        Self::new(
            url,
            cfg.media.upload_preset.clone(),
            cfg.media.cloud_name.clone(),
            cfg.gateway_timeout(),
        )
    }

    pub fn build_form(&self, file: &ImageFile) -> Result<Form, UploadError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.content_type)
            .map_err(GatewayError::from)?;
        Ok(Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("cloud_name", self.cloud_name.clone()))
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    #[instrument(skip_all, fields(file = %file.file_name))]
    async fn upload(&self, file: &ImageFile) -> Result<String, UploadError> {
        let form = self.build_form(file)?;
        let res = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(GatewayError::from)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %body, "media host rejected upload");
            return Err(GatewayError::Status { status, body }.into());
        }
        let payload: UploadResponse = res.json().await.map_err(GatewayError::from)?;
        let url = payload
            .secure_url
            .filter(|u| !u.is_empty())
            .ok_or(UploadError::MissingUrl)?;
        info!(%url, "image uploaded");
        Ok(url)
    }
}

/// Grant to apply one upload result to the draft it was started for.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadTicket {
    draft: u64,
}

/// Tracks the single upload allowed per draft.
#[derive(Debug, Default)]
pub struct UploadSlot {
    in_flight: Option<u64>,
}

impl UploadSlot {
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Reserve the slot for `draft`. A second upload while one is pending is
    /// refused.
    pub fn begin(&mut self, draft: u64) -> Result<UploadTicket, UploadError> {
        if self.in_flight.is_some() {
            return Err(UploadError::Busy);
        }
        self.in_flight = Some(draft);
        Ok(UploadTicket { draft })
    }

    /// Release the slot. Returns whether the result still belongs to
    /// `current_draft`.
    pub fn finish(&mut self, ticket: UploadTicket, current_draft: u64) -> bool {
        if self.in_flight == Some(ticket.draft) {
            self.in_flight = None;
        }
        ticket.draft == current_draft
    }

    /// Forget any pending upload; its result will be dropped on arrival.
    pub fn reset(&mut self) {
        self.in_flight = None;
    }
}
