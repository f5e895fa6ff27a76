//! Typed errors for the remote collaborators.
//!
//! Each service has its own error with a category and a one-line message
//! suitable for showing to the user. Failures are scoped to the action that
//! triggered them; none of these are fatal to the client.

use std::fmt;

use serde_json::Value;

/// Categories of auth failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Unknown email or wrong password.
    InvalidCredentials,
    /// Sign-up with an email that already has an account.
    EmailInUse,
    /// Password rejected by the provider's policy.
    WeakPassword,
    InvalidEmail,
    UserDisabled,
    /// The federated sign-in flow was dismissed.
    PopupClosed,
    /// The backend cannot perform this flow.
    Unsupported,
    /// Operation requires a signed-in user.
    NotSignedIn,
    /// Connection failure before a response arrived.
    Network,
    /// Non-success HTTP status without a recognized error code.
    Http,
    /// Response body could not be parsed.
    Parse,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthErrorKind::InvalidCredentials => "invalid_credentials",
            AuthErrorKind::EmailInUse => "email_in_use",
            AuthErrorKind::WeakPassword => "weak_password",
            AuthErrorKind::InvalidEmail => "invalid_email",
            AuthErrorKind::UserDisabled => "user_disabled",
            AuthErrorKind::PopupClosed => "popup_closed",
            AuthErrorKind::Unsupported => "unsupported",
            AuthErrorKind::NotSignedIn => "not_signed_in",
            AuthErrorKind::Network => "network",
            AuthErrorKind::Http => "http_status",
            AuthErrorKind::Parse => "parse",
        };
        f.write_str(label)
    }
}

/// Error from the auth service.
#[derive(Debug, Clone)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    /// One-line summary suitable for display.
    pub message: String,
    /// Optional additional details (e.g., raw error body).
    pub details: Option<String>,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            AuthErrorKind::InvalidCredentials,
            "The email or password is incorrect.",
        )
    }

    pub fn not_signed_in() -> Self {
        Self::new(AuthErrorKind::NotSignedIn, "No user is signed in.")
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthError {}

/// Categories of blob storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    Unauthorized,
    NotFound,
    Network,
    Http,
    Parse,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StorageErrorKind::Unauthorized => "unauthorized",
            StorageErrorKind::NotFound => "not_found",
            StorageErrorKind::Network => "network",
            StorageErrorKind::Http => "http_status",
            StorageErrorKind::Parse => "parse",
        };
        f.write_str(label)
    }
}

/// Error from the blob store.
#[derive(Debug, Clone)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error from a non-success HTTP response.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => StorageErrorKind::Unauthorized,
            404 => StorageErrorKind::NotFound,
            _ => StorageErrorKind::Http,
        };
        let (message, details) = status_message(status, body);
        Self {
            kind,
            message,
            details,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StorageError {}

/// Categories of document store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocErrorKind {
    PermissionDenied,
    /// The record cannot be written (e.g. unsupported field value).
    InvalidRecord,
    /// A stored document does not match the expected record shape.
    Decode,
    Network,
    Http,
    Parse,
    /// The subscription ended because the store went away.
    Closed,
}

impl fmt::Display for DocErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocErrorKind::PermissionDenied => "permission_denied",
            DocErrorKind::InvalidRecord => "invalid_record",
            DocErrorKind::Decode => "decode",
            DocErrorKind::Network => "network",
            DocErrorKind::Http => "http_status",
            DocErrorKind::Parse => "parse",
            DocErrorKind::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Error from the document store.
#[derive(Debug, Clone)]
pub struct DocError {
    pub kind: DocErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl DocError {
    pub fn new(kind: DocErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error from a non-success HTTP response.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => DocErrorKind::PermissionDenied,
            _ => DocErrorKind::Http,
        };
        let (message, details) = status_message(status, body);
        Self {
            kind,
            message,
            details,
        }
    }
}

impl fmt::Display for DocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DocError {}

impl From<chirp_types::DecodeError> for DocError {
    fn from(err: chirp_types::DecodeError) -> Self {
        Self::new(DocErrorKind::Decode, err.to_string())
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type DocResult<T> = std::result::Result<T, DocError>;

/// Extracts `error.message` from a JSON error body, if present.
pub fn api_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

fn status_message(status: u16, body: &str) -> (String, Option<String>) {
    let details = (!body.is_empty()).then(|| body.to_string());
    match api_error_message(body) {
        Some(msg) => (format!("HTTP {status}: {msg}"), details),
        None => (format!("HTTP {status}"), details),
    }
}
