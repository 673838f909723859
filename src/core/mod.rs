//! Core types for the synchronization client.

pub mod config;
pub mod errors;
pub mod ids;
pub mod types;

pub use config::{ApiConfig, MentionConfig, PollConfig, SyncConfig};
pub use errors::{SyncError, SyncResult};
pub use ids::{ChatId, IdError, MutationId, ObjectKey};
pub use types::{
    ChatMessage, ChatSummary, DeleteOutcome, Document, DocumentStatus, GeneratedFile,
    MessageRole, ModelChoice, ModelInfo, RoleParseError, SendReceipt, UploadAck,
};
