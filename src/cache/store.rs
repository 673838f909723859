//! Versioned in-memory store for remote-backed collections.
//!
//! Four collections are tracked: the chat list, and per-chat message,
//! uploaded-document, and generated-file lists. Every entry carries a
//! monotonically increasing version; version-guarded writes keep a slow
//! in-flight fetch from overwriting a newer optimistic write. Writes
//! replace a collection wholesale, never merge it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::core::ids::ChatId;
use crate::core::types::{ChatMessage, ChatSummary, Document, GeneratedFile};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which cached collection an event refers to.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum CacheTopic {
    /// The chat list.
    Chats,
    /// The message list of one chat.
    Messages(ChatId),
    /// The uploaded-document list of one chat.
    Documents(ChatId),
    /// The generated-file list of one chat.
    Generated(ChatId),
}

/// What happened to a cache entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheChange {
    /// The entry value was replaced.
    Updated,
    /// The entry was marked stale; the next read should re-fetch.
    Invalidated,
    /// The entry was removed entirely.
    Purged,
}

/// Change notification published synchronously on every cache write.
#[derive(Clone, Debug)]
pub struct CacheEvent {
    /// The collection that changed.
    pub topic: CacheTopic,
    /// How it changed.
    pub change: CacheChange,
}

/// Cloned view of one cache entry.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheSnapshot<T> {
    /// The cached collection.
    pub value: T,
    /// Version the value was written at.
    pub version: u64,
    /// Whether the entry has been invalidated since that write.
    pub stale: bool,
}

#[derive(Clone, Debug)]
struct Entry<T> {
    value: T,
    version: u64,
    stale: bool,
}

impl<T: Clone> Entry<T> {
    fn snapshot(&self) -> CacheSnapshot<T> {
        CacheSnapshot {
            value: self.value.clone(),
            version: self.version,
            stale: self.stale,
        }
    }
}

/// Keyed, versioned store for remote-backed collections.
///
/// The cache is the only shared mutable state of the synchronization core;
/// all writers go through its versioned setters, so last-writer-wins is
/// defined by version, not by wall-clock arrival order.
pub struct ResourceCache {
    chats: Mutex<Option<Entry<Vec<ChatSummary>>>>,
    messages: DashMap<ChatId, Entry<Vec<ChatMessage>>>,
    documents: DashMap<ChatId, Entry<Vec<Document>>>,
    generated: DashMap<ChatId, Entry<Vec<GeneratedFile>>>,
    events: broadcast::Sender<CacheEvent>,
}

impl ResourceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            chats: Mutex::new(None),
            messages: DashMap::new(),
            documents: DashMap::new(),
            generated: DashMap::new(),
            events,
        }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn publish(&self, topic: CacheTopic, change: CacheChange) {
        // Nobody listening is fine; events are best-effort notification.
        let _ = self.events.send(CacheEvent { topic, change });
    }

    fn lock_chats(&self) -> MutexGuard<'_, Option<Entry<Vec<ChatSummary>>>> {
        self.chats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ----- chat list ------------------------------------------------------

    /// Snapshot of the chat list, if one was ever written.
    #[must_use]
    pub fn chats(&self) -> Option<CacheSnapshot<Vec<ChatSummary>>> {
        self.lock_chats().as_ref().map(Entry::snapshot)
    }

    /// Replace the chat list, bumping its version.
    pub fn set_chats(&self, value: Vec<ChatSummary>) -> u64 {
        let version = {
            let mut slot = self.lock_chats();
            let version = slot.as_ref().map_or(0, |e| e.version) + 1;
            *slot = Some(Entry {
                value,
                version,
                stale: false,
            });
            version
        };
        self.publish(CacheTopic::Chats, CacheChange::Updated);
        version
    }

    /// Replace the chat list only if nothing newer was written since the
    /// `based_on` version was observed.
    pub fn try_set_chats(&self, value: Vec<ChatSummary>, based_on: u64) -> bool {
        let applied = {
            let mut slot = self.lock_chats();
            let current = slot.as_ref().map_or(0, |e| e.version);
            if current > based_on {
                false
            } else {
                *slot = Some(Entry {
                    value,
                    version: current.max(based_on) + 1,
                    stale: false,
                });
                true
            }
        };
        if applied {
            self.publish(CacheTopic::Chats, CacheChange::Updated);
        }
        applied
    }

    /// Mark the chat list stale.
    pub fn invalidate_chats(&self) {
        if let Some(entry) = self.lock_chats().as_mut() {
            entry.stale = true;
        }
        self.publish(CacheTopic::Chats, CacheChange::Invalidated);
    }

    // ----- per-chat collections ------------------------------------------

    /// Snapshot of a chat's message list.
    #[must_use]
    pub fn messages(&self, chat: &ChatId) -> Option<CacheSnapshot<Vec<ChatMessage>>> {
        Self::map_get(&self.messages, chat)
    }

    /// Replace a chat's message list, bumping its version.
    pub fn set_messages(&self, chat: ChatId, value: Vec<ChatMessage>) -> u64 {
        let topic = CacheTopic::Messages(chat.clone());
        let version = Self::map_set(&self.messages, chat, value);
        self.publish(topic, CacheChange::Updated);
        version
    }

    /// Version-guarded replace of a chat's message list.
    pub fn try_set_messages(&self, chat: ChatId, value: Vec<ChatMessage>, based_on: u64) -> bool {
        let topic = CacheTopic::Messages(chat.clone());
        let applied = Self::map_try_set(&self.messages, chat, value, based_on);
        if applied {
            self.publish(topic, CacheChange::Updated);
        }
        applied
    }

    /// Mark a chat's message list stale.
    pub fn invalidate_messages(&self, chat: &ChatId) {
        Self::map_invalidate(&self.messages, chat);
        self.publish(CacheTopic::Messages(chat.clone()), CacheChange::Invalidated);
    }

    /// Remove a chat's message list entirely (rollback to "never fetched").
    pub fn remove_messages(&self, chat: &ChatId) {
        self.messages.remove(chat);
        self.publish(CacheTopic::Messages(chat.clone()), CacheChange::Updated);
    }

    /// Snapshot of a chat's uploaded-document list.
    #[must_use]
    pub fn documents(&self, chat: &ChatId) -> Option<CacheSnapshot<Vec<Document>>> {
        Self::map_get(&self.documents, chat)
    }

    /// Replace a chat's uploaded-document list, bumping its version.
    pub fn set_documents(&self, chat: ChatId, value: Vec<Document>) -> u64 {
        let topic = CacheTopic::Documents(chat.clone());
        let version = Self::map_set(&self.documents, chat, value);
        self.publish(topic, CacheChange::Updated);
        version
    }

    /// Version-guarded replace of a chat's uploaded-document list.
    pub fn try_set_documents(&self, chat: ChatId, value: Vec<Document>, based_on: u64) -> bool {
        let topic = CacheTopic::Documents(chat.clone());
        let applied = Self::map_try_set(&self.documents, chat, value, based_on);
        if applied {
            self.publish(topic, CacheChange::Updated);
        }
        applied
    }

    /// Mark a chat's uploaded-document list stale.
    pub fn invalidate_documents(&self, chat: &ChatId) {
        Self::map_invalidate(&self.documents, chat);
        self.publish(CacheTopic::Documents(chat.clone()), CacheChange::Invalidated);
    }

    /// Snapshot of a chat's generated-file list.
    #[must_use]
    pub fn generated(&self, chat: &ChatId) -> Option<CacheSnapshot<Vec<GeneratedFile>>> {
        Self::map_get(&self.generated, chat)
    }

    /// Replace a chat's generated-file list, bumping its version.
    pub fn set_generated(&self, chat: ChatId, value: Vec<GeneratedFile>) -> u64 {
        let topic = CacheTopic::Generated(chat.clone());
        let version = Self::map_set(&self.generated, chat, value);
        self.publish(topic, CacheChange::Updated);
        version
    }

    /// Version-guarded replace of a chat's generated-file list.
    pub fn try_set_generated(
        &self,
        chat: ChatId,
        value: Vec<GeneratedFile>,
        based_on: u64,
    ) -> bool {
        let topic = CacheTopic::Generated(chat.clone());
        let applied = Self::map_try_set(&self.generated, chat, value, based_on);
        if applied {
            self.publish(topic, CacheChange::Updated);
        }
        applied
    }

    /// Mark a chat's generated-file list stale.
    pub fn invalidate_generated(&self, chat: &ChatId) {
        Self::map_invalidate(&self.generated, chat);
        self.publish(CacheTopic::Generated(chat.clone()), CacheChange::Invalidated);
    }

    // ----- cascade --------------------------------------------------------

    /// Purge every entry belonging to a deleted chat, including its chat
    /// list row, in one synchronous pass.
    pub fn purge_chat(&self, chat: &ChatId) {
        {
            let mut slot = self.lock_chats();
            if let Some(entry) = slot.as_mut() {
                entry.value.retain(|c| &c.id != chat);
                entry.version += 1;
            }
        }
        self.messages.remove(chat);
        self.documents.remove(chat);
        self.generated.remove(chat);

        self.publish(CacheTopic::Chats, CacheChange::Updated);
        self.publish(CacheTopic::Messages(chat.clone()), CacheChange::Purged);
        self.publish(CacheTopic::Documents(chat.clone()), CacheChange::Purged);
        self.publish(CacheTopic::Generated(chat.clone()), CacheChange::Purged);
    }

    // ----- shared helpers -------------------------------------------------

    fn map_get<T: Clone>(
        map: &DashMap<ChatId, Entry<T>>,
        chat: &ChatId,
    ) -> Option<CacheSnapshot<T>> {
        map.get(chat).map(|entry| entry.snapshot())
    }

    fn map_set<T>(map: &DashMap<ChatId, Entry<T>>, chat: ChatId, value: T) -> u64 {
        let version = map.get(&chat).map_or(0, |e| e.version) + 1;
        map.insert(
            chat,
            Entry {
                value,
                version,
                stale: false,
            },
        );
        version
    }

    fn map_try_set<T>(
        map: &DashMap<ChatId, Entry<T>>,
        chat: ChatId,
        value: T,
        based_on: u64,
    ) -> bool {
        let current = map.get(&chat).map_or(0, |e| e.version);
        if current > based_on {
            return false;
        }
        map.insert(
            chat,
            Entry {
                value,
                version: current.max(based_on) + 1,
                stale: false,
            },
        );
        true
    }

    fn map_invalidate<T>(map: &DashMap<ChatId, Entry<T>>, chat: &ChatId) {
        if let Some(mut entry) = map.get_mut(chat) {
            entry.stale = true;
        }
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn chat(id: &str) -> ChatId {
        ChatId::new(id).unwrap()
    }

    fn messages(texts: &[&str]) -> Vec<ChatMessage> {
        texts.iter().map(|t| ChatMessage::user(*t)).collect()
    }

    #[test]
    fn test_versions_are_monotonic() {
        let cache = ResourceCache::new();
        let id = chat("7");
        let v1 = cache.set_messages(id.clone(), messages(&["a"]));
        let v2 = cache.set_messages(id.clone(), messages(&["a", "b"]));
        assert!(v2 > v1);
        let snapshot = cache.messages(&id).unwrap();
        assert_eq!(snapshot.version, v2);
        assert_eq!(snapshot.value.len(), 2);
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let cache = ResourceCache::new();
        let id = chat("7");

        // A fetch observes version 1, then an optimistic write lands.
        let based_on = cache.set_messages(id.clone(), messages(&["a"]));
        cache.set_messages(id.clone(), messages(&["a", "optimistic"]));

        assert!(!cache.try_set_messages(id.clone(), messages(&["a"]), based_on));
        let snapshot = cache.messages(&id).unwrap();
        assert_eq!(snapshot.value[1].content, "optimistic");
    }

    #[test]
    fn test_reapplying_same_snapshot_is_suppressed() {
        let cache = ResourceCache::new();
        let id = chat("7");
        let based_on = cache.messages(&id).map_or(0, |s| s.version);

        assert!(cache.try_set_messages(id.clone(), messages(&["a"]), based_on));
        let after_first = cache.messages(&id).unwrap();

        // Second application of the identical reconciliation snapshot.
        assert!(!cache.try_set_messages(id.clone(), messages(&["a"]), based_on));
        let after_second = cache.messages(&id).unwrap();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_try_set_applies_to_absent_entry() {
        let cache = ResourceCache::new();
        let id = chat("9");
        assert!(cache.try_set_messages(id.clone(), messages(&["a"]), 0));
        assert!(cache.messages(&id).is_some());
    }

    #[test]
    fn test_invalidate_marks_stale_without_touching_value() {
        let cache = ResourceCache::new();
        let id = chat("7");
        cache.set_documents(id.clone(), Vec::new());
        cache.invalidate_documents(&id);
        let snapshot = cache.documents(&id).unwrap();
        assert!(snapshot.stale);
        assert!(snapshot.value.is_empty());

        // A fresh write clears the flag.
        cache.set_documents(id.clone(), Vec::new());
        assert!(!cache.documents(&id).unwrap().stale);
    }

    #[test]
    fn test_purge_chat_removes_every_entry() {
        let cache = ResourceCache::new();
        let id = chat("7");
        let summary = crate::core::types::ChatSummary::freshly_created(id.clone());
        cache.set_chats(vec![summary]);
        cache.set_messages(id.clone(), messages(&["a"]));
        cache.set_documents(id.clone(), Vec::new());
        cache.set_generated(id.clone(), Vec::new());

        cache.purge_chat(&id);

        assert!(cache.chats().unwrap().value.is_empty());
        assert!(cache.messages(&id).is_none());
        assert!(cache.documents(&id).is_none());
        assert!(cache.generated(&id).is_none());
    }

    #[test]
    fn test_changes_notify_observers_synchronously() {
        let cache = ResourceCache::new();
        let mut events = cache.subscribe();
        let id = chat("7");

        cache.set_messages(id.clone(), messages(&["a"]));
        let event = events.try_recv().unwrap();
        assert_eq!(event.topic, CacheTopic::Messages(id.clone()));
        assert_eq!(event.change, CacheChange::Updated);

        cache.invalidate_messages(&id);
        let event = events.try_recv().unwrap();
        assert_eq!(event.change, CacheChange::Invalidated);
    }

    #[test]
    fn test_rejected_write_publishes_nothing() {
        let cache = ResourceCache::new();
        let id = chat("7");
        cache.set_messages(id.clone(), messages(&["a"]));
        cache.set_messages(id.clone(), messages(&["a", "b"]));

        let mut events = cache.subscribe();
        assert!(!cache.try_set_messages(id.clone(), messages(&["old"]), 1));
        assert!(events.try_recv().is_err());
    }
}
