//! Remote agent API contract and transport implementations.
//!
//! - `wire`: serde payloads matching the remote API's JSON exactly
//! - `http`: reqwest transport implementing the contract
//!
//! The synchronization core only ever talks to the [`AgentApi`] trait, so
//! tests substitute a scripted in-memory implementation.

pub mod http;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpAgentApi;

use std::future::Future;
use std::pin::Pin;

use crate::core::errors::SyncResult;
use crate::core::ids::ChatId;
use crate::core::types::{
    ChatMessage, ChatSummary, DeleteOutcome, Document, GeneratedFile, ModelChoice, ModelInfo,
    UploadAck,
};

/// Boxed future type for remote API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outgoing message body for a send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    /// Full payload text, including any document prefix.
    pub message: String,
    /// Optional model selector.
    pub model: Option<ModelChoice>,
}

/// A file the user picked for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentUpload {
    /// Display file name.
    pub file_name: String,
    /// MIME type, when the picker knows it.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Contract the synchronization core expects from the remote agent API.
///
/// Every operation is asynchronous and may be slow; callers must treat the
/// returned state as authoritative and replace, never merge, cached copies.
pub trait AgentApi: Send + Sync {
    /// List the user's chats.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn list_chats(&self) -> ApiFuture<'_, SyncResult<Vec<ChatSummary>>>;

    /// Allocate the next chat identifier.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn next_chat_id(&self) -> ApiFuture<'_, SyncResult<ChatId>>;

    /// Fetch the full message history of a chat.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn chat_history(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<ChatMessage>>>;

    /// Send a message and return the assistant turns it produced.
    ///
    /// # Errors
    /// Returns an error if the remote call fails or the agent errors out.
    fn post_message(
        &self,
        chat: ChatId,
        request: SendRequest,
    ) -> ApiFuture<'_, SyncResult<Vec<ChatMessage>>>;

    /// Rename a chat; returns the name echoed by the server.
    ///
    /// # Errors
    /// Returns an error if the remote call fails or the chat is unknown.
    fn rename_chat(&self, chat: ChatId, name: String) -> ApiFuture<'_, SyncResult<String>>;

    /// Hard-delete a chat and everything attached to it.
    ///
    /// # Errors
    /// Returns an error if the remote call fails or the chat is unknown.
    fn delete_chat(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<DeleteOutcome>>;

    /// List the chat's uploaded documents.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn list_documents(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<Document>>>;

    /// List the chat's generated files.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn list_generated(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<GeneratedFile>>>;

    /// Upload a document; ingestion continues server-side after the ack.
    ///
    /// # Errors
    /// Returns an error if the remote call fails or the file is rejected.
    fn upload_document(
        &self,
        chat: ChatId,
        upload: DocumentUpload,
    ) -> ApiFuture<'_, SyncResult<UploadAck>>;

    /// List the models the server can route a send to.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn list_models(&self) -> ApiFuture<'_, SyncResult<Vec<ModelInfo>>>;
}
