#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use jobboard_admin::config::PopupMode;
use jobboard_admin::console::{Console, ConsoleSettings};
use jobboard_admin::error::{GatewayError, UploadError};
use jobboard_admin::gateway::Gateway;
use jobboard_admin::model::{ResourceId, ResourceKind};
use jobboard_admin::notify::Notifier;
use jobboard_admin::session::{Credentials, MemoryTokenStore, SessionGuard, TokenStore};
use jobboard_admin::upload::{ImageFile, MediaUploader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    List(ResourceKind, String),
    Create(ResourceKind, Value),
    Update(ResourceKind, ResourceId, Value),
    Delete(ResourceKind, ResourceId),
}

/// In-memory stand-in for the remote API that records every call.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    records: Arc<Mutex<HashMap<ResourceKind, Vec<Value>>>>,
    next_id: Arc<Mutex<i64>>,
    failures: Arc<Mutex<VecDeque<Option<GatewayError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingGateway {
    pub async fn seed(&self, kind: ResourceKind, records: Vec<Value>) {
        let max_id = records
            .iter()
            .filter_map(|r| r["id"].as_i64())
            .max()
            .unwrap_or(0);
        let mut next = self.next_id.lock().await;
        *next = (*next).max(max_id);
        self.records.lock().await.insert(kind, records);
    }

    /// Make the next gateway call fail with `err`.
    pub async fn fail_next(&self, err: GatewayError) {
        self.failures.lock().await.push_back(Some(err));
    }

    /// Let the next call through; queued failures apply to the calls after it.
    pub async fn pass_next(&self) {
        self.failures.lock().await.push_back(None);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn list_calls(&self, kind: ResourceKind) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| matches!(c, Call::List(k, _) if *k == kind))
            .count()
    }

    pub async fn server_records(&self, kind: ResourceKind) -> Vec<Value> {
        self.records
            .lock()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    async fn record(&self, call: Call) -> Result<(), GatewayError> {
        self.calls.lock().await.push(call);
        match self.failures.lock().await.pop_front().flatten() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn login(&self, credentials: &Credentials) -> Result<String, GatewayError> {
        self.record(Call::Login(credentials.username.clone())).await?;
        if credentials.password == "secret" {
            Ok(format!("token-{}", credentials.username))
        } else {
            Err(GatewayError::Status {
                status: StatusCode::UNAUTHORIZED,
                body: "Invalid password".into(),
            })
        }
    }

    async fn list(&self, kind: ResourceKind, token: &str) -> Result<Vec<Value>, GatewayError> {
        self.record(Call::List(kind, token.to_string())).await?;
        Ok(self.server_records(kind).await)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        body: &Value,
        _token: &str,
    ) -> Result<Value, GatewayError> {
        self.record(Call::Create(kind, body.clone())).await?;
        let id = {
            let mut next = self.next_id.lock().await;
            *next += 1;
            *next
        };
        let mut record = body.clone();
        record["id"] = json!(id);
        self.records
            .lock()
            .await
            .entry(kind)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        body: &Value,
        _token: &str,
    ) -> Result<Value, GatewayError> {
        self.record(Call::Update(kind, id.clone(), body.clone())).await?;
        let mut records = self.records.lock().await;
        let list = records.entry(kind).or_default();
        let mut updated = body.clone();
        updated["id"] = json!(id);
        for record in list.iter_mut() {
            if record["id"] == json!(id) {
                *record = updated.clone();
            }
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        _token: &str,
    ) -> Result<(), GatewayError> {
        self.record(Call::Delete(kind, id.clone())).await?;
        self.records
            .lock()
            .await
            .entry(kind)
            .or_default()
            .retain(|r| r["id"] != json!(id));
        Ok(())
    }
}

/// Media host fake answering from a queue of canned results.
#[derive(Clone, Default)]
pub struct RecordingUploader {
    responses: Arc<Mutex<VecDeque<Result<String, UploadError>>>>,
    uploads: Arc<Mutex<Vec<String>>>,
}

impl RecordingUploader {
    pub fn with_responses(responses: Vec<Result<String, UploadError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    pub async fn uploads(&self) -> Vec<String> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl MediaUploader for RecordingUploader {
    async fn upload(&self, file: &ImageFile) -> Result<String, UploadError> {
        self.uploads.lock().await.push(file.file_name.clone());
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(format!("https://cdn.example/{}", file.file_name)))
    }
}

pub struct Harness {
    pub console: Console,
    pub gateway: RecordingGateway,
    pub uploader: RecordingUploader,
    pub tokens: Arc<MemoryTokenStore>,
}

pub fn harness(token: Option<&str>, popup_mode: PopupMode) -> Harness {
    harness_with(token, popup_mode, RecordingUploader::default())
}

pub fn harness_with(token: Option<&str>, popup_mode: PopupMode, uploader: RecordingUploader) -> Harness {
    let tokens = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::default(),
    });
    let gateway = RecordingGateway::default();
    let store: Arc<dyn TokenStore> = tokens.clone();
    let console = Console::new(
        SessionGuard::new(store),
        Arc::new(gateway.clone()),
        Arc::new(uploader.clone()),
        Notifier::new(Duration::from_secs(3)),
        ConsoleSettings {
            page_size: 8,
            popup_mode,
        },
    );
    Harness {
        console,
        gateway,
        uploader,
        tokens,
    }
}

pub fn job(id: i64, company: &str) -> Value {
    json!({
        "id": id,
        "companyname": company,
        "title": "Engineer",
        "description": "Degree#2024",
        "apply_link": "https://apply.example",
        "image_link": "https://cdn.example/logo.png",
        "url": "https://jobs.example",
        "salary": null
    })
}

pub fn image(name: &str) -> ImageFile {
    ImageFile {
        file_name: name.to_string(),
        content_type: "image/png",
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    }
}
