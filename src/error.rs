//! Error types for CIMI client operations.

use thiserror::Error;

use crate::value::Value;

/// Errors that can occur during CIMI client operations.
#[derive(Debug, Error)]
pub enum CimiError {
    /// Configuration is missing or incomplete.
    #[error("CIMI configuration required: {0}")]
    ConfigMissing(String),

    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body that should be structured could not be decoded.
    #[error("malformed document: {message} (near `{fragment}`)")]
    MalformedDocument { message: String, fragment: String },

    /// The server rejected the presented credentials or session.
    #[error("authentication failed with status {status}: {message}")]
    AuthenticationFailed {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// The server requires a session and none is held.
    #[error("not authenticated: {message}")]
    NotAuthenticated { status: u16, message: String },

    /// The addressed resource does not exist.
    #[error("resource '{url}' not found")]
    ResourceNotFound { url: String, body: Option<Value> },

    /// Any other non-success response.
    #[error("server rejected request with status {status}: {message}")]
    ServerRejected {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// The cloud entry point could not be fetched or understood.
    #[error("cloud entry point unavailable: {reason}")]
    EntryPointUnavailable {
        reason: String,
        #[source]
        source: Option<Box<CimiError>>,
    },

    /// The cloud entry point does not list the requested collection.
    #[error("unknown resource type '{0}': not listed in the cloud entry point")]
    UnknownResourceType(String),

    /// Request options could not be turned into query parameters.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A value has no wire representation.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// The blocking client could not start its async runtime.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl CimiError {
    /// HTTP status carried by protocol-level failures.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { status, .. }
            | Self::NotAuthenticated { status, .. }
            | Self::ServerRejected { status, .. } => Some(*status),
            Self::ResourceNotFound { .. } => Some(404),
            Self::EntryPointUnavailable {
                source: Some(inner),
                ..
            } => inner.status_code(),
            _ => None,
        }
    }

    /// Decoded error document returned by the server, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::AuthenticationFailed { body, .. }
            | Self::ResourceNotFound { body, .. }
            | Self::ServerRejected { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns true when the addressed resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// Returns true when re-authenticating might resolve the failure.
    ///
    /// Looks through [`CimiError::EntryPointUnavailable`] at the failure
    /// that prevented the entry point from loading.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. } | Self::NotAuthenticated { .. } => true,
            Self::EntryPointUnavailable {
                source: Some(inner),
                ..
            } => inner.is_auth_error(),
            _ => false,
        }
    }

    /// Returns true when no HTTP response was received, including while
    /// loading the cloud entry point.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::EntryPointUnavailable {
                source: Some(inner),
                ..
            } => inner.is_transport(),
            _ => false,
        }
    }

    pub(crate) fn entry_point(reason: impl Into<String>, source: Option<Self>) -> Self {
        Self::EntryPointUnavailable {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }
}

/// Result type alias for CIMI operations.
pub type Result<T> = core::result::Result<T, CimiError>;
