//! Scripted in-memory implementation of the remote API for tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::Notify;

use crate::api::{AgentApi, ApiFuture, DocumentUpload, SendRequest};
use crate::core::errors::{SyncError, SyncResult};
use crate::core::ids::{ChatId, ObjectKey};
use crate::core::types::{
    ChatMessage, ChatSummary, DeleteOutcome, Document, DocumentStatus, GeneratedFile,
    MessageRole, ModelInfo, UploadAck,
};

fn remote_failure(op: &str) -> SyncError {
    SyncError::Status {
        status: 500,
        detail: format!("scripted failure: {op}"),
    }
}

#[derive(Default)]
struct ScriptState {
    chats: Vec<ChatSummary>,
    histories: HashMap<ChatId, Vec<ChatMessage>>,
    documents: HashMap<ChatId, Vec<Document>>,
    generated: HashMap<ChatId, Vec<GeneratedFile>>,
    models: Vec<ModelInfo>,
    reply: Option<ChatMessage>,
    calls: Vec<String>,
}

/// Programmable [`AgentApi`] double: serves canned state, records calls,
/// and injects failures per operation.
pub(crate) struct ScriptedApi {
    state: Mutex<ScriptState>,
    next_id: AtomicU64,
    fail_post: AtomicBool,
    fail_rename: AtomicBool,
    fail_upload: AtomicBool,
    fail_lists: AtomicBool,
    post_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ScriptState::default()),
            next_id: AtomicU64::new(1),
            fail_post: AtomicBool::new(false),
            fail_rename: AtomicBool::new(false),
            fail_upload: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            post_gate: Mutex::new(None),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn chat(id: &str) -> ChatId {
        ChatId::new(id).unwrap()
    }

    pub(crate) fn indexed_document(key: &str, name: &str) -> Document {
        Document {
            object_key: ObjectKey::new(key).unwrap(),
            file_name: name.to_string(),
            size: Some(1024),
            last_modified: Some(Utc::now()),
            download_url: format!("http://files.local/{key}"),
            status: DocumentStatus::Indexed,
            tags: HashMap::new(),
        }
    }

    pub(crate) fn processing_document(key: &str, name: &str) -> Document {
        Document {
            status: DocumentStatus::Processing,
            ..Self::indexed_document(key, name)
        }
    }

    pub(crate) fn generated_file(key: &str, name: &str) -> GeneratedFile {
        GeneratedFile {
            object_key: ObjectKey::new(key).unwrap(),
            file_name: name.to_string(),
            size: Some(2048),
            last_modified: Some(Utc::now()),
            download_url: format!("http://files.local/{key}"),
            tags: HashMap::new(),
        }
    }

    pub(crate) fn push_chat(&self, chat: ChatSummary) {
        self.lock().chats.push(chat);
    }

    pub(crate) fn set_history(&self, chat: &ChatId, messages: Vec<ChatMessage>) {
        self.lock().histories.insert(chat.clone(), messages);
    }

    pub(crate) fn set_documents(&self, chat: &ChatId, documents: Vec<Document>) {
        self.lock().documents.insert(chat.clone(), documents);
    }

    pub(crate) fn set_generated(&self, chat: &ChatId, files: Vec<GeneratedFile>) {
        self.lock().generated.insert(chat.clone(), files);
    }

    pub(crate) fn set_models(&self, models: Vec<ModelInfo>) {
        self.lock().models = models;
    }

    pub(crate) fn set_reply(&self, reply: ChatMessage) {
        self.lock().reply = Some(reply);
    }

    pub(crate) fn fail_post(&self, fail: bool) {
        self.fail_post.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_rename(&self, fail: bool) {
        self.fail_rename.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Make `post_message` block until the returned handle is notified.
    pub(crate) fn gate_posts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self
            .post_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    fn take_gate(&self) -> Option<Arc<Notify>> {
        self.post_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AgentApi for ScriptedApi {
    fn list_chats(&self) -> ApiFuture<'_, SyncResult<Vec<ChatSummary>>> {
        Box::pin(async move {
            self.record("list_chats");
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(remote_failure("list_chats"));
            }
            Ok(self.lock().chats.clone())
        })
    }

    fn next_chat_id(&self) -> ApiFuture<'_, SyncResult<ChatId>> {
        Box::pin(async move {
            self.record("next_chat_id");
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(Self::chat(&format!("{id}")))
        })
    }

    fn chat_history(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            self.record(format!("chat_history:{chat}"));
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(remote_failure("chat_history"));
            }
            Ok(self.lock().histories.get(&chat).cloned().unwrap_or_default())
        })
    }

    fn post_message(
        &self,
        chat: ChatId,
        request: SendRequest,
    ) -> ApiFuture<'_, SyncResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            self.record(format!("post_message:{chat}:{}", request.message));
            if let Some(gate) = self.take_gate() {
                gate.notified().await;
            }
            if self.fail_post.load(Ordering::SeqCst) {
                return Err(remote_failure("post_message"));
            }

            // Persist the user turn plus the scripted assistant reply, the
            // way the real server stores both before responding.
            let mut state = self.lock();
            let reply = state.reply.clone().unwrap_or_else(|| ChatMessage {
                role: MessageRole::Assistant,
                content: format!("echo: {}", request.message),
                agent: Some("supervisor".to_string()),
                timestamp: Utc::now(),
            });
            let history = state.histories.entry(chat.clone()).or_default();
            history.push(ChatMessage::user(request.message));
            history.push(reply.clone());
            let count = history.len() as u64;
            if let Some(summary) = state.chats.iter_mut().find(|c| c.id == chat) {
                summary.message_count = count;
                summary.last_message_time = Some(Utc::now());
            }
            Ok(vec![reply])
        })
    }

    fn rename_chat(&self, chat: ChatId, name: String) -> ApiFuture<'_, SyncResult<String>> {
        Box::pin(async move {
            self.record(format!("rename_chat:{chat}:{name}"));
            if self.fail_rename.load(Ordering::SeqCst) {
                return Err(remote_failure("rename_chat"));
            }
            let mut state = self.lock();
            match state.chats.iter_mut().find(|c| c.id == chat) {
                Some(summary) => {
                    summary.name = Some(name.clone());
                    Ok(name)
                }
                None => Err(SyncError::Status {
                    status: 404,
                    detail: "Chat not found or no changes made".to_string(),
                }),
            }
        })
    }

    fn delete_chat(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<DeleteOutcome>> {
        Box::pin(async move {
            self.record(format!("delete_chat:{chat}"));
            let mut state = self.lock();
            let before = state.chats.len();
            state.chats.retain(|c| c.id != chat);
            if state.chats.len() == before {
                return Err(SyncError::Status {
                    status: 404,
                    detail: "Chat not found".to_string(),
                });
            }
            let messages = state.histories.remove(&chat).map_or(0, |m| m.len() as u64);
            let documents = state.documents.remove(&chat).map_or(0, |d| d.len() as u64);
            let generated = state.generated.remove(&chat).map_or(0, |g| g.len() as u64);
            Ok(DeleteOutcome {
                messages,
                files: documents + generated,
                embeddings: documents * 8,
                checkpoints: 1,
            })
        })
    }

    fn list_documents(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<Document>>> {
        Box::pin(async move {
            self.record(format!("list_documents:{chat}"));
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(remote_failure("list_documents"));
            }
            Ok(self.lock().documents.get(&chat).cloned().unwrap_or_default())
        })
    }

    fn list_generated(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<GeneratedFile>>> {
        Box::pin(async move {
            self.record(format!("list_generated:{chat}"));
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(remote_failure("list_generated"));
            }
            Ok(self.lock().generated.get(&chat).cloned().unwrap_or_default())
        })
    }

    fn upload_document(
        &self,
        chat: ChatId,
        upload: DocumentUpload,
    ) -> ApiFuture<'_, SyncResult<UploadAck>> {
        Box::pin(async move {
            self.record(format!("upload_document:{chat}:{}", upload.file_name));
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(remote_failure("upload_document"));
            }
            let key = format!("user-1/{chat}/{}", upload.file_name);
            Ok(UploadAck {
                object_key: ObjectKey::new(&key).unwrap(),
                message: "Upload successful. Ingestion started.".to_string(),
                status: Some(DocumentStatus::Processing),
            })
        })
    }

    fn list_models(&self) -> ApiFuture<'_, SyncResult<Vec<ModelInfo>>> {
        Box::pin(async move {
            self.record("list_models");
            Ok(self.lock().models.clone())
        })
    }
}
