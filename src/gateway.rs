use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::model::{ResourceId, ResourceKind};
use crate::session::Credentials;

/// Remote API contract consumed by the console.
///
/// Bodies and list entries are raw JSON; typed decoding happens in the store
/// so that one gateway serves every resource kind.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns the bearer token on success.
    async fn login(&self, credentials: &Credentials) -> Result<String, GatewayError>;

    async fn list(&self, kind: ResourceKind, token: &str) -> Result<Vec<Value>, GatewayError>;

    async fn create(
        &self,
        kind: ResourceKind,
        body: &Value,
        token: &str,
    ) -> Result<Value, GatewayError>;

    async fn update(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        body: &Value,
        token: &str,
    ) -> Result<Value, GatewayError>;

    async fn delete(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        token: &str,
    ) -> Result<(), GatewayError>;
}

#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .user_agent(concat!("jobboard-admin/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&cfg.gateway.base_url)
            .map_err(|err| GatewayError::InvalidUrl(err.to_string()))?;
        Self::new(base_url, cfg.gateway_timeout())
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::InvalidUrl(format!("{}: {}", path, err)))
    }

    /// Build a request against `path` (relative to the base URL).
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, GatewayError> {
        let mut builder = self.http.request(method, self.endpoint(path)?);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    /// Send a request and return the response text of a 2xx answer.
    async fn execute(&self, request: reqwest::Request) -> Result<String, GatewayError> {
        debug!(method=%request.method(), url=%request.url(), "sending gateway request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            warn!(%status, body=%text, "gateway rejected request");
            return Err(GatewayError::Status { status, body: text });
        }
        Ok(res.text().await?)
    }
}

fn parse_json(text: &str) -> Result<Value, GatewayError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|err| GatewayError::Decode(err.to_string()))
}

/// Normalize a list response into records.
///
/// Single-popup deployments answer with one object (or `{}`/`null` when none
/// exists) instead of an array.
pub fn normalize_list(value: Value) -> Result<Vec<Value>, GatewayError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        Value::Object(map) => Ok(vec![Value::Object(map)]),
        other => Err(GatewayError::Decode(format!(
            "expected a list of records, got {}",
            other
        ))),
    }
}

pub fn list_path(kind: ResourceKind) -> String {
    format!("{}/adminpanel", kind.as_str())
}

pub fn item_path(kind: ResourceKind, id: &ResourceId) -> String {
    format!("{}/{}", kind.as_str(), id)
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[async_trait]
impl Gateway for GatewayClient {
    #[instrument(skip_all)]
    async fn login(&self, credentials: &Credentials) -> Result<String, GatewayError> {
        let body = serde_json::to_value(credentials)
            .map_err(|err| GatewayError::Decode(err.to_string()))?;
        let request = self.build_request(Method::POST, "login", None, Some(&body))?;
        let text = self.execute(request).await?;
        let payload: LoginResponse =
            serde_json::from_str(&text).map_err(|err| GatewayError::Decode(err.to_string()))?;
        payload
            .token
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingToken)
    }

    #[instrument(skip_all, fields(kind = kind.as_str()))]
    async fn list(&self, kind: ResourceKind, token: &str) -> Result<Vec<Value>, GatewayError> {
        let request = self.build_request(Method::GET, &list_path(kind), Some(token), None)?;
        let text = self.execute(request).await?;
        normalize_list(parse_json(&text)?)
    }

    #[instrument(skip_all, fields(kind = kind.as_str()))]
    async fn create(
        &self,
        kind: ResourceKind,
        body: &Value,
        token: &str,
    ) -> Result<Value, GatewayError> {
        let request = self.build_request(Method::POST, kind.as_str(), Some(token), Some(body))?;
        parse_json(&self.execute(request).await?)
    }

    #[instrument(skip_all, fields(kind = kind.as_str(), %id))]
    async fn update(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        body: &Value,
        token: &str,
    ) -> Result<Value, GatewayError> {
        let request =
            self.build_request(Method::PUT, &item_path(kind, id), Some(token), Some(body))?;
        parse_json(&self.execute(request).await?)
    }

    #[instrument(skip_all, fields(kind = kind.as_str(), %id))]
    async fn delete(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        token: &str,
    ) -> Result<(), GatewayError> {
        let request = self.build_request(Method::DELETE, &item_path(kind, id), Some(token), None)?;
        self.execute(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GatewayClient {
        let base = Url::parse("https://backend.example/api/").unwrap();
        GatewayClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn paths_follow_gateway_layout() {
        assert_eq!(list_path(ResourceKind::Jobs), "jobs/adminpanel");
        assert_eq!(list_path(ResourceKind::Popups), "popup/adminpanel");
        assert_eq!(item_path(ResourceKind::Jobs, &ResourceId::Num(7)), "jobs/7");
        assert_eq!(
            item_path(ResourceKind::Popups, &ResourceId::Text("p1".into())),
            "popup/p1"
        );
    }

    #[test]
    fn build_request_sets_bearer_and_json() {
        let body = json!({ "title": "Engineer" });
        let request = client()
            .build_request(Method::PUT, "jobs/7", Some("tok"), Some(&body))
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().path(), "/api/jobs/7");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer tok"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }

    #[test]
    fn login_request_has_no_authorization() {
        let body = json!({ "username": "admin", "password": "pw" });
        let request = client()
            .build_request(Method::POST, "login", None, Some(&body))
            .unwrap();
        assert_eq!(request.url().path(), "/api/login");
        assert!(request.headers().get("Authorization").is_none());
    }

    #[test]
    fn normalize_list_accepts_every_shape() {
        assert_eq!(normalize_list(json!([{ "id": 1 }, { "id": 2 }])).unwrap().len(), 2);
        assert_eq!(normalize_list(json!({ "id": 1 })).unwrap().len(), 1);
        assert!(normalize_list(json!({})).unwrap().is_empty());
        assert!(normalize_list(Value::Null).unwrap().is_empty());
        assert!(matches!(
            normalize_list(json!("oops")),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn empty_ack_parses_as_null() {
        assert_eq!(parse_json("").unwrap(), Value::Null);
        assert_eq!(parse_json("{\"ok\":true}").unwrap()["ok"], true);
    }

    /// Serve one connection with `response`, then hold the socket open.
    async fn serve_once(response: String) -> GatewayClient {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let base = Url::parse(&format!("http://{}/api/", addr)).unwrap();
        GatewayClient::new(base, Duration::from_millis(300)).unwrap()
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn list_reads_records_from_socket() {
        let client = serve_once(http_response("200 OK", r#"[{"id":1},{"id":2}]"#)).await;
        let items = client.list(ResourceKind::Jobs, "tok").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn stalled_list_body_is_an_error_not_an_empty_list() {
        let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n[{\"id\":1},";
        let client = serve_once(head.to_string()).await;

        let result = client.list(ResourceKind::Jobs, "tok").await;

        match result {
            Err(err) => assert!(err.is_transport(), "unexpected error {:?}", err),
            Ok(items) => panic!("expected a transport error, got {:?}", items),
        }
    }

    #[tokio::test]
    async fn rejected_list_keeps_status_and_body() {
        let client = serve_once(http_response("401 Unauthorized", "Token expired")).await;

        let err = client.list(ResourceKind::Jobs, "tok").await.unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(err.to_string(), "Token expired");
    }

    #[tokio::test]
    async fn login_without_token_is_missing_token() {
        let client = serve_once(http_response("200 OK", r#"{"message":"ok"}"#)).await;
        let creds = Credentials {
            username: "admin".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            client.login(&creds).await,
            Err(GatewayError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn login_with_html_body_is_a_decode_error() {
        let client = serve_once(http_response("200 OK", "<html>maintenance</html>")).await;
        let creds = Credentials {
            username: "admin".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            client.login(&creds).await,
            Err(GatewayError::Decode(_))
        ));
    }
}
