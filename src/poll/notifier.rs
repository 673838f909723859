//! Transition detection over successive polled snapshots.
//!
//! The notifier keeps the previously observed snapshot of each polled
//! collection and emits exactly one event per qualifying transition; an
//! identical snapshot observed again emits nothing.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::core::ids::{ChatId, ObjectKey};
use crate::core::types::{Document, DocumentStatus, GeneratedFile};

/// User-facing event emitted when a polled resource transitions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransitionEvent {
    /// A document finished indexing and can now be referenced.
    DocumentReady {
        /// Chat the document belongs to.
        chat: ChatId,
        /// Display file name.
        file_name: String,
        /// Canonical reference token.
        object_key: ObjectKey,
    },
    /// New generated files appeared since the previous snapshot.
    FilesGenerated {
        /// Chat the files belong to.
        chat: ChatId,
        /// Number of files that appeared.
        count: usize,
    },
}

/// Diffs successive cache snapshots of pollable resources.
pub struct TransitionNotifier {
    documents: DashMap<ChatId, Vec<Document>>,
    generated_counts: DashMap<ChatId, usize>,
    tx: UnboundedSender<TransitionEvent>,
}

impl TransitionNotifier {
    /// Create a notifier and the receiving end of its event stream.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<TransitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                documents: DashMap::new(),
                generated_counts: DashMap::new(),
                tx,
            },
            rx,
        )
    }

    /// Observe a fresh document snapshot for a chat.
    ///
    /// Emits one `DocumentReady` per item whose status moved from
    /// `processing` to `indexed` since the previous snapshot (matched by
    /// file name), and per item absent before that first appears already
    /// `indexed`. The first snapshot of a chat only establishes the
    /// baseline.
    pub fn observe_documents(&self, chat: &ChatId, current: &[Document]) {
        let previous = self.documents.insert(chat.clone(), current.to_vec());
        let Some(previous) = previous else {
            return;
        };

        for document in current {
            if document.status != DocumentStatus::Indexed {
                continue;
            }
            let became_ready = match previous
                .iter()
                .find(|p| p.file_name == document.file_name)
            {
                Some(before) => before.status == DocumentStatus::Processing,
                None => true,
            };
            if became_ready {
                debug!(chat = %chat, file = %document.file_name, "document ready");
                let _ = self.tx.send(TransitionEvent::DocumentReady {
                    chat: chat.clone(),
                    file_name: document.file_name.clone(),
                    object_key: document.object_key.clone(),
                });
            }
        }
    }

    /// Observe a fresh generated-file snapshot for a chat.
    ///
    /// Emits one `FilesGenerated` carrying the delta when the count grew.
    pub fn observe_generated(&self, chat: &ChatId, current: &[GeneratedFile]) {
        let previous = self.generated_counts.insert(chat.clone(), current.len());
        let Some(previous) = previous else {
            return;
        };

        if current.len() > previous {
            let count = current.len() - previous;
            debug!(chat = %chat, count, "generated files appeared");
            let _ = self.tx.send(TransitionEvent::FilesGenerated {
                chat: chat.clone(),
                count,
            });
        }
    }

    /// Drop the baselines of a chat (after deletion).
    pub fn forget(&self, chat: &ChatId) {
        self.documents.remove(chat);
        self.generated_counts.remove(chat);
    }
}
