//! Domain types shared across the synchronization core.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ids::{ChatId, ObjectKey};

/// Role of a chat message author.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// A message typed by the user.
    User,
    /// A message produced by the remote agent.
    Assistant,
}

impl MessageRole {
    /// Canonical lowercase wire spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role spelling cannot be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message role: {0}")]
pub struct RoleParseError(String);

impl FromStr for MessageRole {
    type Err = RoleParseError;

    /// Parse a role, tolerating the legacy spellings older history rows
    /// carry (`ai`, `human`, mixed case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "human" => Ok(Self::User),
            "assistant" | "ai" => Ok(Self::Assistant),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

/// Server-side lifecycle of an uploaded document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Ingestion is queued or running.
    #[default]
    Processing,
    /// Ingestion completed; the document can be referenced.
    Indexed,
    /// Ingestion failed server-side.
    Error,
}

impl DocumentStatus {
    /// Canonical lowercase wire spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Indexed => "indexed",
            Self::Error => "error",
        }
    }

    /// Parse a status tag, mapping unknown values to `Processing`.
    ///
    /// The status is observed-only; a conservative default keeps an
    /// unrecognized document visible but unselectable.
    #[must_use]
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "indexed" => Self::Indexed,
            "error" => Self::Error,
            _ => Self::Processing,
        }
    }

    /// Whether the document is eligible as a mention target.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Indexed)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary row in the chat list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Server-issued chat identifier.
    pub id: ChatId,
    /// User-assigned display name, when one was set.
    pub name: Option<String>,
    /// Number of stored messages.
    pub message_count: u64,
    /// Timestamp of the first message.
    pub first_message_time: Option<DateTime<Utc>>,
    /// Timestamp of the most recent message.
    pub last_message_time: Option<DateTime<Utc>>,
}

impl ChatSummary {
    /// Optimistic entry for a chat that was just allocated client-side.
    #[must_use]
    pub fn freshly_created(id: ChatId) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            message_count: 0,
            first_message_time: Some(now),
            last_message_time: Some(now),
        }
    }

    /// Display label: the assigned name, or a label derived from the id.
    #[must_use]
    pub fn display_label(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Chat {}", self.id),
        }
    }
}

/// One message within a chat. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: MessageRole,
    /// Textual content.
    pub content: String,
    /// Originating agent label, when the server reports one.
    pub agent: Option<String>,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Synthesize the optimistic user message for a send in flight.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            agent: None,
            timestamp: Utc::now(),
        }
    }
}

/// An uploaded document and its observed indexing state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Canonical server-assigned reference token.
    pub object_key: ObjectKey,
    /// Display file name.
    pub file_name: String,
    /// Size in bytes, when known.
    pub size: Option<u64>,
    /// Last-modified time, when known.
    pub last_modified: Option<DateTime<Utc>>,
    /// Short-lived download locator.
    pub download_url: String,
    /// Indexing status, observed via polling.
    pub status: DocumentStatus,
    /// Arbitrary server-side tags.
    pub tags: HashMap<String, String>,
}

/// A file produced by the agent as a side effect of its activity.
///
/// Same shape as [`Document`] minus the status: a generated file is
/// complete once it is visible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Canonical server-assigned reference token.
    pub object_key: ObjectKey,
    /// Display file name.
    pub file_name: String,
    /// Size in bytes, when known.
    pub size: Option<u64>,
    /// Last-modified time, when known.
    pub last_modified: Option<DateTime<Utc>>,
    /// Short-lived download locator.
    pub download_url: String,
    /// Arbitrary server-side tags.
    pub tags: HashMap<String, String>,
}

/// Model selector forwarded with a send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelChoice {
    /// Provider key (e.g. `ollama`, `groq`).
    pub provider: String,
    /// Provider-specific model name.
    pub name: String,
}

/// A model the server advertises as selectable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider key.
    pub provider: String,
    /// Provider-specific model name.
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
}

/// Server acknowledgment for an accepted upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    /// Object key assigned to the stored file.
    pub object_key: ObjectKey,
    /// Human-readable acknowledgment.
    pub message: String,
    /// Initial ingestion status, when reported.
    pub status: Option<DocumentStatus>,
}

/// Server-reported deletion counts. Informational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Messages removed.
    pub messages: u64,
    /// Stored files removed (uploads and generated content).
    pub files: u64,
    /// Vector embeddings removed.
    pub embeddings: u64,
    /// Conversation checkpoints removed.
    pub checkpoints: u64,
}

/// Result of a completed send mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendReceipt {
    /// Chat the message landed in.
    pub chat: ChatId,
    /// Whether the chat was created implicitly by this send.
    pub created_chat: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_and_legacy_spellings() {
        assert_eq!("user".parse::<MessageRole>(), Ok(MessageRole::User));
        assert_eq!("AI".parse::<MessageRole>(), Ok(MessageRole::Assistant));
        assert_eq!("Human".parse::<MessageRole>(), Ok(MessageRole::User));
        assert!("tool".parse::<MessageRole>().is_err());
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_status_parse_lossy_defaults_to_processing() {
        assert_eq!(DocumentStatus::parse_lossy("indexed"), DocumentStatus::Indexed);
        assert_eq!(DocumentStatus::parse_lossy("ERROR"), DocumentStatus::Error);
        assert_eq!(
            DocumentStatus::parse_lossy("queued"),
            DocumentStatus::Processing
        );
        assert!(!DocumentStatus::Processing.is_ready());
        assert!(DocumentStatus::Indexed.is_ready());
    }

    #[test]
    fn test_display_label_falls_back_to_id() {
        let id = ChatId::new("7").unwrap_or_else(|_| unreachable!());
        let mut chat = ChatSummary::freshly_created(id);
        assert_eq!(chat.display_label(), "Chat 7");
        chat.name = Some("Lesson plans".to_string());
        assert_eq!(chat.display_label(), "Lesson plans");
        chat.name = Some("   ".to_string());
        assert_eq!(chat.display_label(), "Chat 7");
    }

    #[test]
    fn test_freshly_created_has_zero_messages() {
        let id = ChatId::new("12").unwrap_or_else(|_| unreachable!());
        let chat = ChatSummary::freshly_created(id);
        assert_eq!(chat.message_count, 0);
        assert!(chat.first_message_time.is_some());
        assert!(chat.last_message_time.is_some());
    }

    #[test]
    fn test_synthesized_user_message() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.agent.is_none());
    }
}
