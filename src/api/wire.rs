//! Wire-format payloads for the remote agent API.
//!
//! Field names match the server's JSON exactly; conversions into domain
//! types validate identifiers and normalize legacy role and status
//! spellings.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{SyncError, SyncResult};
use crate::core::ids::{ChatId, ObjectKey};
use crate::core::types::{
    ChatMessage, ChatSummary, DeleteOutcome, Document, DocumentStatus, GeneratedFile,
    MessageRole, ModelInfo, UploadAck,
};

/// Row of `GET /api/chats`.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatSummaryDto {
    /// Server-issued chat identifier.
    pub chat_id: String,
    /// Display name, when one was set.
    #[serde(default)]
    pub chat_name: Option<String>,
    /// Number of stored messages.
    pub message_count: u64,
    /// Timestamp of the first message.
    #[serde(default)]
    pub first_message_time: Option<DateTime<Utc>>,
    /// Timestamp of the most recent message.
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
}

impl TryFrom<ChatSummaryDto> for ChatSummary {
    type Error = SyncError;

    fn try_from(dto: ChatSummaryDto) -> SyncResult<Self> {
        Ok(Self {
            id: ChatId::new(&dto.chat_id)?,
            name: dto.chat_name,
            message_count: dto.message_count,
            first_message_time: dto.first_message_time,
            last_message_time: dto.last_message_time,
        })
    }
}

/// Message row of `GET /api/chats/{id}` and `POST .../messages` responses.
#[derive(Clone, Debug, Deserialize)]
pub struct AgentMessageDto {
    /// Author role spelling as stored server-side.
    pub role: String,
    /// Textual content.
    pub content: String,
    /// Originating agent label, when reported.
    #[serde(default)]
    pub agent: Option<String>,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<AgentMessageDto> for ChatMessage {
    type Error = SyncError;

    fn try_from(dto: AgentMessageDto) -> SyncResult<Self> {
        let role = MessageRole::from_str(&dto.role)
            .map_err(|err| SyncError::InvalidPayload(err.to_string()))?;
        Ok(Self {
            role,
            content: dto.content,
            agent: dto.agent,
            timestamp: dto.timestamp,
        })
    }
}

/// Body of `POST /api/chats/{id}/messages`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessageRequestDto {
    /// User message forwarded to the agent.
    pub message: String,
    /// Optional provider key of the selected model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
    /// Optional name of the selected model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Response of `POST /api/chats/{id}/messages`.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatMessageResponseDto {
    /// Assistant turns produced by this send, in server order.
    pub messages: Vec<AgentMessageDto>,
}

/// Body of `PUT /api/chats/{id}/name`.
#[derive(Clone, Debug, Serialize)]
pub struct UpdateChatNameRequestDto {
    /// Requested display name.
    pub chat_name: String,
}

/// Response of `PUT /api/chats/{id}/name`.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateChatNameResponseDto {
    /// Whether the rename was applied.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Echoed chat identifier.
    pub chat_id: String,
    /// Echoed display name.
    pub chat_name: String,
}

/// Response of `DELETE /api/chats/{id}`.
#[derive(Clone, Debug, Deserialize)]
pub struct DeleteChatResponseDto {
    /// Whether the deletion was applied.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Stored files removed.
    pub deleted_files_count: u64,
    /// Messages removed.
    pub deleted_messages_count: u64,
    /// Vector embeddings removed.
    pub deleted_embeddings_count: u64,
    /// Conversation checkpoints removed.
    pub deleted_checkpoints_count: u64,
}

impl From<DeleteChatResponseDto> for DeleteOutcome {
    fn from(dto: DeleteChatResponseDto) -> Self {
        Self {
            messages: dto.deleted_messages_count,
            files: dto.deleted_files_count,
            embeddings: dto.deleted_embeddings_count,
            checkpoints: dto.deleted_checkpoints_count,
        }
    }
}

/// File row of `GET /api/files/uploads/{id}` and `.../generated/{id}`.
#[derive(Clone, Debug, Deserialize)]
pub struct FileMetadataDto {
    /// Canonical server-assigned key.
    pub object_key: String,
    /// Display file name.
    pub file_name: String,
    /// Last-modified time, when known.
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes, when known.
    #[serde(default)]
    pub size: Option<u64>,
    /// Short-lived download locator.
    pub download_url: String,
    /// Server-side tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Ingestion status tag, present on uploaded documents.
    #[serde(default)]
    pub status: Option<String>,
}

impl FileMetadataDto {
    /// Convert into an uploaded document.
    ///
    /// # Errors
    /// Returns an error if the object key is not valid key material.
    pub fn into_document(self) -> SyncResult<Document> {
        Ok(Document {
            object_key: ObjectKey::new(&self.object_key)?,
            file_name: self.file_name,
            size: self.size,
            last_modified: self.last_modified,
            download_url: self.download_url,
            status: self
                .status
                .as_deref()
                .map_or(DocumentStatus::Processing, DocumentStatus::parse_lossy),
            tags: self.tags,
        })
    }

    /// Convert into a generated file.
    ///
    /// # Errors
    /// Returns an error if the object key is not valid key material.
    pub fn into_generated(self) -> SyncResult<GeneratedFile> {
        Ok(GeneratedFile {
            object_key: ObjectKey::new(&self.object_key)?,
            file_name: self.file_name,
            size: self.size,
            last_modified: self.last_modified,
            download_url: self.download_url,
            tags: self.tags,
        })
    }
}

/// Response of `GET /api/chats/next-id`.
#[derive(Clone, Debug, Deserialize)]
pub struct NextChatIdDto {
    /// Identifier the next created chat will use.
    pub next_chat_id: String,
}

/// Response of `POST /api/files/upload`.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadResponseDto {
    /// Object key assigned to the stored file.
    pub object_key: String,
    /// Human-readable acknowledgment.
    pub message: String,
    /// Initial ingestion status, when reported.
    #[serde(default)]
    pub status: Option<String>,
}

impl TryFrom<UploadResponseDto> for UploadAck {
    type Error = SyncError;

    fn try_from(dto: UploadResponseDto) -> SyncResult<Self> {
        Ok(Self {
            object_key: ObjectKey::new(&dto.object_key)?,
            message: dto.message,
            status: dto.status.as_deref().map(DocumentStatus::parse_lossy),
        })
    }
}

/// Model row of `GET /api/models`.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelInfoDto {
    /// Provider key.
    pub provider: String,
    /// Provider-specific model name.
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
}

impl From<ModelInfoDto> for ModelInfo {
    fn from(dto: ModelInfoDto) -> Self {
        Self {
            provider: dto.provider,
            name: dto.name,
            display_name: dto.display_name,
        }
    }
}

/// Response of `GET /api/models`.
#[derive(Clone, Debug, Deserialize)]
pub struct AvailableModelsDto {
    /// Models the server can route a send to.
    pub models: Vec<ModelInfoDto>,
}

/// Error body the server attaches to non-2xx responses.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBodyDto {
    /// Human-readable failure detail.
    pub detail: String,
}
