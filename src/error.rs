//! Error kinds surfaced by the console core.
//!
//! Nothing here is retried automatically: every error ends the attempt that
//! produced it and the operator decides whether to try again.
use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failure talking to the gateway or the media host.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx answer; `body` is the raw response text.
    #[error("{}", status_detail(.status, .body))]
    Status { status: StatusCode, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("login response carried no token")]
    MissingToken,
}

fn status_detail(status: &StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}

impl GatewayError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// True when the request never produced an HTTP answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Network(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Login failed or the session is no longer accepted.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Login failed: you are offline or the request failed ({0})")]
    Offline(String),
    #[error("Invalid username")]
    InvalidUsername,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Login failed: {0}")]
    Rejected(String),
    #[error("Login failed: response carried no token")]
    MissingToken,
    #[error("Session expired, please log in again")]
    SessionExpired,
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("failed to access session storage: {0}")]
    Storage(#[from] std::io::Error),
}

/// Retrieving a collection failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("unexpected record shape: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_auth_failure(&self) -> bool {
        match self {
            FetchError::NotAuthenticated => true,
            FetchError::Gateway(err) => err.is_auth_failure(),
            FetchError::Decode(_) => false,
        }
    }
}

/// Required fields were empty; raised before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("All fields are required!")]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

/// Create, update or delete was rejected.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("record {0} is not in the current collection")]
    UnknownRecord(String),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("only one popup may exist; edit or delete the current one")]
    SingleRecordExists,
}

impl MutationError {
    pub fn is_auth_failure(&self) -> bool {
        match self {
            MutationError::NotAuthenticated => true,
            MutationError::Gateway(err) => err.is_auth_failure(),
            _ => false,
        }
    }
}

/// Image upload failed; the draft's image field is left as it was.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("an upload is already in progress")]
    Busy,
    #[error("{0} is not an image file")]
    NotAnImage(String),
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image upload failed: {0}")]
    Host(#[from] GatewayError),
    #[error("Image upload failed: response carried no secure_url")]
    MissingUrl,
}

/// Form submission outcome error.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl SubmitError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SubmitError::Mutation(err) if err.is_auth_failure())
    }
}

/// Unknown or read-only field name used against a resource.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown field '{0}'")]
pub struct FieldError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_displays_raw_body() {
        let err = GatewayError::Status {
            status: StatusCode::BAD_REQUEST,
            body: "title is too long".into(),
        };
        assert_eq!(err.to_string(), "title is too long");

        let err = GatewayError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "  ".into(),
        };
        assert_eq!(err.to_string(), "502 Bad Gateway");
    }

    #[test]
    fn auth_failures_are_recognised() {
        let unauthorized = GatewayError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(unauthorized.is_auth_failure());
        assert!(FetchError::from(unauthorized).is_auth_failure());
        assert!(!FetchError::from(GatewayError::Timeout).is_auth_failure());
        assert!(MutationError::NotAuthenticated.is_auth_failure());
        assert!(!MutationError::SingleRecordExists.is_auth_failure());
    }
}
