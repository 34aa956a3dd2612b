// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Classifies remote failures and local validation errors

use thiserror::Error;

/// Classification of a non-success response from the remote APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServerError,
    BadRequest,
}

impl RemoteErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => RemoteErrorKind::NotFound,
            401 => RemoteErrorKind::Unauthorized,
            403 => RemoteErrorKind::Forbidden,
            429 => RemoteErrorKind::RateLimited,
            500..=599 => RemoteErrorKind::ServerError,
            _ => RemoteErrorKind::BadRequest,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::Forbidden => "forbidden",
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::ServerError => "server error",
            RemoteErrorKind::BadRequest => "bad request",
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not authenticated: {0}. Please run: gdocs auth login")]
    AuthenticationRequired(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// `length` is unknown when the index is rejected before fetching.
    #[error("Index {index} is out of range ({})", describe_bounds(.length))]
    IndexOutOfRange { index: i64, length: Option<usize> },

    #[error("Refusing to insert empty text")]
    EmptyInsertion,

    #[error("Unsupported format: {extension:?}. Supported: {}", crate::export::supported_extensions().join(", "))]
    UnsupportedFormat { extension: String },

    #[error("{operation} failed: {kind} (HTTP {status}): {message}")]
    Remote {
        operation: String,
        kind: RemoteErrorKind,
        status: u16,
        message: String,
    },

    #[error("Export of {document_id} failed (HTTP {status}): {message}")]
    Export {
        document_id: String,
        status: u16,
        message: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl Error {
    pub fn remote(operation: &str, status: u16, message: impl Into<String>) -> Self {
        Error::Remote {
            operation: operation.into(),
            kind: RemoteErrorKind::from_status(status),
            status,
            message: message.into(),
        }
    }

    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Error::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Failures worth retrying with backoff: throttling, 5xx and dropped connections.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Remote { kind, .. } => matches!(
                kind,
                RemoteErrorKind::RateLimited | RemoteErrorKind::ServerError
            ),
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::AuthenticationRequired(_) | Error::Auth(_) => 2,
            Error::Network(_) => 3,
            Error::Remote { .. } | Error::Export { .. } => 4,
            Error::Parse(_) | Error::MalformedDocument(_) => 5,
            Error::Filesystem(_) => 6,
            Error::IndexOutOfRange { .. }
            | Error::EmptyInsertion
            | Error::UnsupportedFormat { .. }
            | Error::InvalidArgument(_) => 7,
            Error::Config(_) => 8,
        }
    }
}

fn describe_bounds(length: &Option<usize>) -> String {
    match length {
        Some(length) => format!("document length {}", length),
        None => "offsets start at 0".into(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
