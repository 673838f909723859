//! Orchestration facade for the synchronization core.
//!
//! Composes the cache, transport, mutation pipeline, poller, and
//! transition notifier behind the surface the presentation layer binds
//! to: current collections, busy flags, mutations against the active
//! chat, and the transition-event stream.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::api::{AgentApi, DocumentUpload, HttpAgentApi};
use crate::cache::{CacheEvent, ResourceCache};
use crate::core::config::SyncConfig;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::ids::ChatId;
use crate::core::types::{
    ChatMessage, ChatSummary, DeleteOutcome, Document, GeneratedFile, ModelChoice, ModelInfo,
    SendReceipt, UploadAck,
};
use crate::mention::OutgoingMessage;
use crate::mutation::MutationPipeline;
use crate::poll::{Poller, TransitionEvent, TransitionNotifier};

/// Client-side synchronization engine.
///
/// All reads go through the versioned cache; all writes go through the
/// mutation pipeline or the poller. Selecting a chat rebinds polling to
/// it; a mutation already in flight for a previous chat still completes
/// and reconciles the cache for that chat.
pub struct SyncEngine {
    api: Arc<dyn AgentApi>,
    cache: Arc<ResourceCache>,
    pipeline: MutationPipeline,
    poller: Poller,
    notifier: Arc<TransitionNotifier>,
    active: Mutex<Option<ChatId>>,
    events: Mutex<Option<UnboundedReceiver<TransitionEvent>>>,
}

impl SyncEngine {
    /// Create an engine over any transport implementation.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SyncConfig, api: Arc<dyn AgentApi>) -> SyncResult<Self> {
        config.validate()?;

        let cache = Arc::new(ResourceCache::new());
        let (notifier, events) = TransitionNotifier::channel();
        let notifier = Arc::new(notifier);
        let pipeline = MutationPipeline::new(Arc::clone(&api), Arc::clone(&cache));
        let poller = Poller::new(
            Arc::clone(&api),
            Arc::clone(&cache),
            Arc::clone(&notifier),
            config.poll.clone(),
        );

        Ok(Self {
            api,
            cache,
            pipeline,
            poller,
            notifier,
            active: Mutex::new(None),
            events: Mutex::new(Some(events)),
        })
    }

    /// Create an engine talking HTTP to the configured base URL.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the transport
    /// cannot be built.
    pub fn from_config(config: SyncConfig) -> SyncResult<Self> {
        let api: Arc<dyn AgentApi> = Arc::new(HttpAgentApi::new(&config.api)?);
        Self::new(config, api)
    }

    /// Take the transition-event stream. Yields `Some` exactly once.
    pub async fn take_events(&self) -> Option<UnboundedReceiver<TransitionEvent>> {
        self.events.lock().await.take()
    }

    /// Subscribe to cache change notifications.
    #[must_use]
    pub fn subscribe_cache(&self) -> broadcast::Receiver<CacheEvent> {
        self.cache.subscribe()
    }

    /// The shared resource cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    // ----- selection ------------------------------------------------------

    /// The currently selected chat.
    pub async fn active_chat(&self) -> Option<ChatId> {
        self.active.lock().await.clone()
    }

    /// Switch the active chat, rebinding background polling.
    ///
    /// Interest in the previous chat's in-flight polls is dropped; an
    /// in-flight mutation still completes against its original chat.
    pub async fn select_chat(&self, chat: Option<ChatId>) {
        {
            let mut active = self.active.lock().await;
            if *active == chat {
                return;
            }
            *active = chat.clone();
        }
        match chat {
            Some(chat) => {
                info!(chat = %chat, "chat selected");
                self.poller.bind(chat).await;
            }
            None => {
                info!("selection cleared");
                self.poller.unbind().await;
            }
        }
    }

    // ----- read-through accessors ----------------------------------------

    /// Current chat list, re-fetching when absent or stale.
    ///
    /// # Errors
    /// Returns an error only when nothing is cached and the fetch fails;
    /// with a cached value, fetch failures fall back to it.
    pub async fn chat_list(&self) -> SyncResult<Vec<ChatSummary>> {
        if let Some(snapshot) = self.cache.chats()
            && !snapshot.stale
        {
            return Ok(snapshot.value);
        }
        let based_on = self.cache.chats().map_or(0, |s| s.version);
        match self.api.list_chats().await {
            Ok(chats) => {
                self.cache.try_set_chats(chats.clone(), based_on);
                Ok(self.cache.chats().map_or(chats, |s| s.value))
            }
            Err(err) => match self.cache.chats() {
                Some(snapshot) => {
                    warn!(error = %err, "chat list refresh failed; serving cached value");
                    Ok(snapshot.value)
                }
                None => Err(err),
            },
        }
    }

    /// Current message list for a chat, re-fetching when absent or stale.
    ///
    /// # Errors
    /// Returns an error only when nothing is cached and the fetch fails.
    pub async fn message_list(&self, chat: &ChatId) -> SyncResult<Vec<ChatMessage>> {
        if let Some(snapshot) = self.cache.messages(chat)
            && !snapshot.stale
        {
            return Ok(snapshot.value);
        }
        let based_on = self.cache.messages(chat).map_or(0, |s| s.version);
        match self.api.chat_history(chat.clone()).await {
            Ok(messages) => {
                self.cache
                    .try_set_messages(chat.clone(), messages.clone(), based_on);
                Ok(self.cache.messages(chat).map_or(messages, |s| s.value))
            }
            Err(err) => match self.cache.messages(chat) {
                Some(snapshot) => {
                    warn!(chat = %chat, error = %err, "history refresh failed; serving cached value");
                    Ok(snapshot.value)
                }
                None => Err(err),
            },
        }
    }

    /// Current uploaded-document list for a chat.
    ///
    /// # Errors
    /// Returns an error only when nothing is cached and the fetch fails.
    pub async fn document_list(&self, chat: &ChatId) -> SyncResult<Vec<Document>> {
        if let Some(snapshot) = self.cache.documents(chat)
            && !snapshot.stale
        {
            return Ok(snapshot.value);
        }
        let based_on = self.cache.documents(chat).map_or(0, |s| s.version);
        match self.api.list_documents(chat.clone()).await {
            Ok(documents) => {
                if self
                    .cache
                    .try_set_documents(chat.clone(), documents.clone(), based_on)
                {
                    self.notifier.observe_documents(chat, &documents);
                }
                Ok(self.cache.documents(chat).map_or(documents, |s| s.value))
            }
            Err(err) => match self.cache.documents(chat) {
                Some(snapshot) => {
                    warn!(chat = %chat, error = %err, "document refresh failed; serving cached value");
                    Ok(snapshot.value)
                }
                None => Err(err),
            },
        }
    }

    /// Current generated-file list for a chat.
    ///
    /// # Errors
    /// Returns an error only when nothing is cached and the fetch fails.
    pub async fn generated_list(&self, chat: &ChatId) -> SyncResult<Vec<GeneratedFile>> {
        if let Some(snapshot) = self.cache.generated(chat)
            && !snapshot.stale
        {
            return Ok(snapshot.value);
        }
        let based_on = self.cache.generated(chat).map_or(0, |s| s.version);
        match self.api.list_generated(chat.clone()).await {
            Ok(files) => {
                if self
                    .cache
                    .try_set_generated(chat.clone(), files.clone(), based_on)
                {
                    self.notifier.observe_generated(chat, &files);
                }
                Ok(self.cache.generated(chat).map_or(files, |s| s.value))
            }
            Err(err) => match self.cache.generated(chat) {
                Some(snapshot) => {
                    warn!(chat = %chat, error = %err, "generated refresh failed; serving cached value");
                    Ok(snapshot.value)
                }
                None => Err(err),
            },
        }
    }

    /// Models the server can route a send to.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    pub async fn available_models(&self) -> SyncResult<Vec<ModelInfo>> {
        self.api.list_models().await
    }

    // ----- busy flags -----------------------------------------------------

    /// Whether a send against this chat is in flight.
    #[must_use]
    pub fn is_sending(&self, chat: &ChatId) -> bool {
        self.pipeline.is_sending(chat)
    }

    /// Whether any send is in flight.
    #[must_use]
    pub fn is_sending_any(&self) -> bool {
        self.pipeline.sending_count() > 0
    }

    /// Whether any upload is in flight.
    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.pipeline.is_uploading()
    }

    // ----- mutations ------------------------------------------------------

    /// Send a draft submission against the active chat, creating a chat
    /// implicitly when none is selected. A newly created chat becomes the
    /// active selection.
    ///
    /// # Errors
    /// Returns [`SyncError::EmptyMessage`] for blank payloads, or the
    /// remote failure after rollback.
    pub async fn send_draft(
        &self,
        outgoing: OutgoingMessage,
        model: Option<ModelChoice>,
    ) -> SyncResult<SendReceipt> {
        let active = self.active_chat().await;
        let receipt = self.pipeline.send_message(active, outgoing, model).await?;
        if receipt.created_chat {
            self.select_chat(Some(receipt.chat.clone())).await;
        }
        Ok(receipt)
    }

    /// Explicitly create a chat and select it.
    ///
    /// # Errors
    /// Returns an error if the identifier allocation fails.
    pub async fn create_chat(&self) -> SyncResult<ChatSummary> {
        let summary = self.pipeline.create_chat().await?;
        self.select_chat(Some(summary.id.clone())).await;
        Ok(summary)
    }

    /// Rename the active chat.
    ///
    /// # Errors
    /// Returns [`SyncError::NoActiveChat`] when nothing is selected,
    /// [`SyncError::EmptyName`] for blank names, or the remote failure.
    pub async fn rename_active_chat(&self, name: &str) -> SyncResult<String> {
        let Some(chat) = self.active_chat().await else {
            return Err(SyncError::NoActiveChat);
        };
        self.pipeline.rename_chat(&chat, name).await
    }

    /// Delete the active chat after the caller obtained user confirmation.
    ///
    /// On success the active selection moves to the first remaining chat
    /// in list order, or to none when the list is empty, and the deleted
    /// chat's cache entries and notifier baselines are gone.
    ///
    /// # Errors
    /// Returns [`SyncError::NoActiveChat`] when nothing is selected, or
    /// the remote failure (with the cache untouched).
    pub async fn delete_active_chat(&self) -> SyncResult<DeleteOutcome> {
        let Some(chat) = self.active_chat().await else {
            return Err(SyncError::NoActiveChat);
        };
        let outcome = self.pipeline.delete_chat(&chat).await?;
        self.notifier.forget(&chat);

        {
            let mut active = self.active.lock().await;
            *active = None;
        }
        self.poller.unbind().await;

        let next = self
            .cache
            .chats()
            .and_then(|s| s.value.first().map(|c| c.id.clone()));
        self.select_chat(next).await;
        Ok(outcome)
    }

    /// Upload a document into the active chat.
    ///
    /// # Errors
    /// Returns [`SyncError::NoActiveChat`] when nothing is selected,
    /// [`SyncError::EmptyUpload`] for empty picks, or the remote failure.
    /// The cache is only touched on success (file lists invalidated).
    pub async fn upload_document(&self, upload: DocumentUpload) -> SyncResult<UploadAck> {
        let Some(chat) = self.active_chat().await else {
            return Err(SyncError::NoActiveChat);
        };
        self.pipeline.upload_document(&chat, upload).await
    }
}
