//! Optimistic mutation pipeline for state-changing operations.
//!
//! Every mutation follows the same three-phase contract: snapshot and
//! optimistically write the affected cache entry, issue the remote call,
//! then reconcile with authoritative state on success or restore the
//! snapshot verbatim on failure. No partial state survives a failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{AgentApi, DocumentUpload, SendRequest};
use crate::cache::ResourceCache;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::ids::{ChatId, MutationId};
use crate::core::types::{
    ChatMessage, ChatSummary, DeleteOutcome, ModelChoice, SendReceipt, UploadAck,
};
use crate::mention::OutgoingMessage;
use crate::mutation::context::MutationContext;

/// Executes state-changing operations with optimistic local application,
/// rollback on failure, and cache reconciliation on success.
pub struct MutationPipeline {
    api: Arc<dyn AgentApi>,
    cache: Arc<ResourceCache>,
    send_locks: DashMap<ChatId, Arc<Mutex<()>>>,
    sending: DashMap<ChatId, ()>,
    uploading: AtomicUsize,
}

impl MutationPipeline {
    /// Create a pipeline over the given transport and cache.
    #[must_use]
    pub fn new(api: Arc<dyn AgentApi>, cache: Arc<ResourceCache>) -> Self {
        Self {
            api,
            cache,
            send_locks: DashMap::new(),
            sending: DashMap::new(),
            uploading: AtomicUsize::new(0),
        }
    }

    /// Whether a send against this chat is in flight.
    #[must_use]
    pub fn is_sending(&self, chat: &ChatId) -> bool {
        self.sending.contains_key(chat)
    }

    /// Number of chats with a send in flight.
    #[must_use]
    pub fn sending_count(&self) -> usize {
        self.sending.len()
    }

    /// Whether any upload is in flight.
    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst) > 0
    }

    /// Send a message, creating a chat implicitly when none is given.
    ///
    /// Sends against the same chat are serialized through a per-chat
    /// queue rather than rejected, so a second submit while one is in
    /// flight cannot race the chat's message list. If the send fails after
    /// an implicit chat creation, the created chat remains and only the
    /// optimistic message is rolled back.
    ///
    /// # Errors
    /// Returns [`SyncError::EmptyMessage`] without any remote call or
    /// state change when the payload is blank, or the remote failure after
    /// rollback.
    pub async fn send_message(
        &self,
        chat: Option<ChatId>,
        outgoing: OutgoingMessage,
        model: Option<ModelChoice>,
    ) -> SyncResult<SendReceipt> {
        if outgoing.payload.trim().is_empty() {
            return Err(SyncError::EmptyMessage);
        }

        let (chat, created_chat) = match chat {
            Some(chat) => (chat, false),
            None => (self.create_chat().await?.id, true),
        };

        let lock = self.send_lock(&chat);
        let _guard = lock.lock().await;

        self.sending.insert(chat.clone(), ());
        let result = self.send_locked(&chat, outgoing, model).await;
        self.sending.remove(&chat);
        result?;

        Ok(SendReceipt { chat, created_chat })
    }

    async fn send_locked(
        &self,
        chat: &ChatId,
        outgoing: OutgoingMessage,
        model: Option<ModelChoice>,
    ) -> SyncResult<()> {
        let mutation = MutationId::new();

        // Optimistic phase: synthesized user message, visible before the
        // remote call resolves.
        let prior = self.cache.messages(chat).map(|s| s.value);
        let context = MutationContext::capture(prior.clone());
        let mut optimistic = prior.unwrap_or_default();
        optimistic.push(ChatMessage::user(outgoing.payload.clone()));
        self.cache.set_messages(chat.clone(), optimistic);
        debug!(%mutation, chat = %chat, "optimistic message applied");

        let request = SendRequest {
            message: outgoing.payload,
            model,
        };
        match self.api.post_message(chat.clone(), request).await {
            Ok(replies) => {
                info!(%mutation, chat = %chat, replies = replies.len(), "send confirmed");
                self.reconcile_send(chat).await;
                Ok(())
            }
            Err(err) => {
                warn!(%mutation, chat = %chat, error = %err, "send failed, rolling back");
                match context.into_prior() {
                    Some(previous) => {
                        self.cache.set_messages(chat.clone(), previous);
                    }
                    None => self.cache.remove_messages(chat),
                }
                Err(err)
            }
        }
    }

    /// Replace the optimistic entries with authoritative state and flag
    /// the collections a send changes as a side effect.
    async fn reconcile_send(&self, chat: &ChatId) {
        match self.api.chat_history(chat.clone()).await {
            Ok(messages) => {
                self.cache.set_messages(chat.clone(), messages);
            }
            Err(err) => {
                warn!(chat = %chat, error = %err, "post-send history refresh failed");
                self.cache.invalidate_messages(chat);
            }
        }
        match self.api.list_chats().await {
            Ok(chats) => {
                self.cache.set_chats(chats);
            }
            Err(err) => {
                warn!(error = %err, "post-send chat list refresh failed");
                self.cache.invalidate_chats();
            }
        }
        // A send may kick off indexing or content generation; let the
        // poller pick both up on its next collapsed tick.
        self.cache.invalidate_documents(chat);
        self.cache.invalidate_generated(chat);
    }

    /// Allocate the next chat identifier and insert an optimistic
    /// zero-message entry at the head of the chat list.
    ///
    /// # Errors
    /// Returns an error if the identifier allocation fails; nothing is
    /// written in that case.
    pub async fn create_chat(&self) -> SyncResult<ChatSummary> {
        let id = self.api.next_chat_id().await?;
        let summary = ChatSummary::freshly_created(id);

        let mut chats = self.cache.chats().map(|s| s.value).unwrap_or_default();
        chats.insert(0, summary.clone());
        self.cache.set_chats(chats);

        info!(chat = %summary.id, "chat allocated");
        Ok(summary)
    }

    /// Rename a chat, applying the new display name optimistically.
    ///
    /// There is no client-held snapshot to restore here: on failure the
    /// chat list is re-fetched, so the prior name comes from the last
    /// successful fetch.
    ///
    /// # Errors
    /// Returns [`SyncError::EmptyName`] when the trimmed name is blank,
    /// or the remote failure after the list refresh.
    pub async fn rename_chat(&self, chat: &ChatId, name: &str) -> SyncResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::EmptyName);
        }

        let mutation = MutationId::new();
        if let Some(snapshot) = self.cache.chats() {
            let mut chats = snapshot.value;
            if let Some(entry) = chats.iter_mut().find(|c| &c.id == chat) {
                entry.name = Some(name.to_string());
            }
            self.cache.set_chats(chats);
            debug!(%mutation, chat = %chat, "optimistic rename applied");
        }

        match self.api.rename_chat(chat.clone(), name.to_string()).await {
            Ok(echoed) => {
                info!(%mutation, chat = %chat, name = %echoed, "rename confirmed");
                Ok(echoed)
            }
            Err(err) => {
                warn!(%mutation, chat = %chat, error = %err, "rename failed, restoring fetched name");
                match self.api.list_chats().await {
                    Ok(chats) => {
                        self.cache.set_chats(chats);
                    }
                    Err(refresh_err) => {
                        warn!(error = %refresh_err, "chat list refresh failed after rename rollback");
                        self.cache.invalidate_chats();
                    }
                }
                Err(err)
            }
        }
    }

    /// Hard-delete a chat and purge every cached entry that referenced it.
    ///
    /// Not optimistic: the cascade is destructive, so nothing is removed
    /// locally until the server confirms. Callers are expected to have
    /// confirmed the deletion with the user before dispatching it.
    ///
    /// # Errors
    /// Returns the remote failure; the cache is untouched in that case.
    pub async fn delete_chat(&self, chat: &ChatId) -> SyncResult<DeleteOutcome> {
        let outcome = self.api.delete_chat(chat.clone()).await?;
        self.cache.purge_chat(chat);
        self.send_locks.remove(chat);
        info!(
            chat = %chat,
            messages = outcome.messages,
            files = outcome.files,
            "chat deleted"
        );
        Ok(outcome)
    }

    /// Upload a document for a chat.
    ///
    /// Not optimistic on content (the document is not locally renderable);
    /// success only invalidates the chat's file lists so the next poll
    /// tick picks up the new `processing` entry.
    ///
    /// # Errors
    /// Returns [`SyncError::EmptyUpload`] without a remote call when the
    /// file name or contents are empty, or the remote failure. Neither
    /// case mutates the cache.
    pub async fn upload_document(
        &self,
        chat: &ChatId,
        upload: DocumentUpload,
    ) -> SyncResult<UploadAck> {
        if upload.file_name.trim().is_empty() {
            return Err(SyncError::EmptyUpload("file name is missing".to_string()));
        }
        if upload.bytes.is_empty() {
            return Err(SyncError::EmptyUpload("file is empty".to_string()));
        }

        let mutation = MutationId::new();
        let file_name = upload.file_name.clone();
        self.uploading.fetch_add(1, Ordering::SeqCst);
        let result = self.api.upload_document(chat.clone(), upload).await;
        self.uploading.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(ack) => {
                info!(%mutation, chat = %chat, file = %file_name, key = %ack.object_key, "upload accepted");
                self.cache.invalidate_documents(chat);
                self.cache.invalidate_generated(chat);
                Ok(ack)
            }
            Err(err) => {
                warn!(%mutation, chat = %chat, file = %file_name, error = %err, "upload failed");
                Err(err)
            }
        }
    }

    fn send_lock(&self, chat: &ChatId) -> Arc<Mutex<()>> {
        self.send_locks.entry(chat.clone()).or_default().clone()
    }
}
