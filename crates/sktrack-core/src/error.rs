//! Error types for sktrack.
//!
//! Every failure that reaches application code is one of the variants of
//! [`Error`]. Request failures are always normalized into [`ApiError`]
//! before they leave the HTTP layer; nothing above it inspects transport
//! internals.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// The unified error type for sktrack operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A normalized request failure (network, timeout, or non-2xx status).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Login and registration failures, classified for the user.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Token persistence failures.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (bad URL, empty credentials).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if the session is gone and the user has to log in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Api(err) if err.kind() == ErrorKind::SessionExpired)
    }

    /// Returns true for failures where no response reached us.
    pub fn is_network(&self) -> bool {
        match self {
            Error::Api(err) => err.code().is_network(),
            Error::Auth(err) => matches!(err, AuthError::Unreachable { .. }),
            _ => false,
        }
    }
}

/// The `code` of a normalized request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The backend answered with this HTTP status.
    Status(u16),
    /// No response was received (connection refused, DNS, TLS, reset).
    Network,
    /// The request exceeded the client timeout.
    Timeout,
}

impl ErrorCode {
    /// Network-class failures: nothing came back from the server.
    pub fn is_network(self) -> bool {
        matches!(self, ErrorCode::Network | ErrorCode::Timeout)
    }

    /// The HTTP status, if the server answered.
    pub fn status(self) -> Option<u16> {
        match self {
            ErrorCode::Status(status) => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Status(status) => write!(f, "HTTP {}", status),
            ErrorCode::Network => f.write_str("network error"),
            ErrorCode::Timeout => f.write_str("timeout"),
        }
    }
}

/// Why a request failed, beyond its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ordinary failure; look at the code.
    Request,
    /// A 401 that could not be recovered by refreshing the access token.
    SessionExpired,
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A normalized request failure.
///
/// This is the only error shape the HTTP layer hands upward. It carries the
/// code, a human-readable message (the backend `detail` when there is one),
/// the raw backend body for callers that want field errors, and the original
/// error for diagnostics.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    kind: ErrorKind,
    message: String,
    details: Option<serde_json::Value>,
    source: Option<BoxError>,
}

impl ApiError {
    /// A failure where the server answered with a non-success status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Status(status),
            kind: ErrorKind::Request,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// A failure where no response arrived.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Network,
            kind: ErrorKind::Request,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// A failure where the client gave up waiting.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Timeout,
            kind: ErrorKind::Request,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// The session could not be recovered after a 401.
    pub fn session_expired() -> Self {
        Self {
            code: ErrorCode::Status(401),
            kind: ErrorKind::SessionExpired,
            message: "session expired, please log in again".to_string(),
            details: None,
            source: None,
        }
    }

    /// Attach the backend response body.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach the original error.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backend response body, when it was JSON.
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Shorthand for `code().status()`.
    pub fn http_status(&self) -> Option<u16> {
        self.code.status()
    }

    /// Per-field messages from a structured validation response.
    ///
    /// The backend reports validation failures as an object mapping field
    /// names to a message or a list of messages. Anything else yields an
    /// empty map.
    pub fn field_errors(&self) -> FieldErrors {
        self.details
            .as_ref()
            .map(FieldErrors::from_body)
            .unwrap_or_default()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Field-level validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Extract field errors from a backend body.
    pub fn from_body(body: &serde_json::Value) -> Self {
        let Some(object) = body.as_object() else {
            return Self::default();
        };

        let fields = object
            .iter()
            .filter_map(|(field, value)| {
                let messages: Vec<String> = match value {
                    serde_json::Value::String(s) => vec![s.clone()],
                    serde_json::Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    _ => return None,
                };
                (!messages.is_empty()).then(|| (field.clone(), messages))
            })
            .collect();

        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for a single field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, messages)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Authentication and session errors.
///
/// The `Display` output of each variant is meant to be shown to a user
/// as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend could not be reached.
    #[error("cannot reach the server, check your connection and try again")]
    Unreachable {
        #[source]
        source: ApiError,
    },

    /// The token-pairing endpoint rejected the credentials.
    #[error("email or password is incorrect")]
    InvalidCredentials,

    /// The backend rejected the input with field-level messages.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Any other rejection from the backend.
    #[error("request rejected: {message}")]
    Rejected { status: Option<u16>, message: String },

    /// A success response that did not carry the expected tokens.
    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    /// The token pair could not be written to the token store.
    #[error("login succeeded but the session could not be saved")]
    NotPersisted {
        #[source]
        source: StorageError,
    },
}

/// Token persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The backing file is not a cookie jar we can read.
    #[error("corrupt cookie jar {path}: {message}")]
    Corrupt { path: String, message: String },

    /// The in-process jar lock was poisoned by a panicking writer.
    #[error("cookie jar lock poisoned")]
    Poisoned,
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid application origin (the host cookies are scoped to).
    #[error("invalid app origin '{value}': {reason}")]
    AppOrigin { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_errors_from_drf_body() {
        let body = json!({
            "email": ["Enter a valid email address."],
            "password": "This field may not be blank.",
            "ignored": 3
        });
        let errors = FieldErrors::from_body(&body);

        assert_eq!(
            errors.get("email"),
            Some(&["Enter a valid email address.".to_string()][..])
        );
        assert_eq!(
            errors.get("password"),
            Some(&["This field may not be blank.".to_string()][..])
        );
        assert!(errors.get("ignored").is_none());
        assert_eq!(
            errors.to_string(),
            "email: Enter a valid email address.; password: This field may not be blank."
        );
    }

    #[test]
    fn field_errors_from_non_object_is_empty() {
        assert!(FieldErrors::from_body(&json!("nope")).is_empty());
        assert!(FieldErrors::from_body(&json!(["a", "b"])).is_empty());
    }

    #[test]
    fn session_expired_is_401() {
        let err = ApiError::session_expired();
        assert_eq!(err.http_status(), Some(401));
        assert_eq!(err.kind(), ErrorKind::SessionExpired);
        assert!(Error::from(err).is_session_expired());
        assert!(!Error::from(AuthError::InvalidCredentials).is_session_expired());
        assert!(!Error::from(ApiError::status(401, "Unauthorized")).is_session_expired());
    }

    #[test]
    fn network_codes() {
        assert!(ErrorCode::Network.is_network());
        assert!(ErrorCode::Timeout.is_network());
        assert!(!ErrorCode::Status(502).is_network());
        assert_eq!(ErrorCode::Status(404).to_string(), "HTTP 404");
    }

    #[test]
    fn api_error_display_uses_message() {
        let err = ApiError::status(403, "You do not have permission.");
        assert_eq!(err.to_string(), "HTTP 403: You do not have permission.");
    }
}
