//! Error types for the synchronization core.

use thiserror::Error;

/// Synchronization error type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Submitted draft is empty after trimming. Rejected locally.
    #[error("message is empty")]
    EmptyMessage,
    /// Chat name is empty after trimming. Rejected locally.
    #[error("chat name is empty")]
    EmptyName,
    /// Upload has no file name or no content. Rejected locally.
    #[error("invalid upload: {0}")]
    EmptyUpload(String),
    /// Operation requires an active chat and none is selected.
    #[error("no active chat")]
    NoActiveChat,
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid identifier received from the server or the caller.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::core::ids::IdError),
    /// HTTP transport failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Remote API rejected the request.
    #[error("remote api error (status {status}): {detail}")]
    Status {
        /// HTTP status code returned by the server.
        status: u16,
        /// Server-provided detail message, or the raw response body.
        detail: String,
    },
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Base or joined URL is invalid.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Well-formed response carrying a value the client cannot accept.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl SyncError {
    /// Whether resubmitting the same operation can reasonably succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }

    /// Whether the error was raised locally, before any remote call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::EmptyMessage
                | Self::EmptyName
                | Self::EmptyUpload(_)
                | Self::NoActiveChat
                | Self::InvalidConfig(_)
        )
    }
}

/// Convenience result alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
