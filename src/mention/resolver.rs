//! Document-mention state machine over a text draft.
//!
//! Driven by the presentation layer on every edit: `update` recomputes the
//! state from the draft and cursor, `candidates` filters the chat's
//! documents against the in-progress query, and `select` rewrites the
//! draft around the chosen document. Cursor positions are char indices.

use crate::core::config::MentionConfig;
use crate::core::ids::ObjectKey;
use crate::core::types::Document;

/// Resolver state, recomputed on every draft edit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MentionState {
    /// No mention is being composed.
    Idle,
    /// The span from `trigger` to the cursor is an in-progress mention.
    Composing {
        /// Char index of the trigger character in the draft.
        trigger: usize,
        /// Query text between the trigger and the cursor.
        query: String,
    },
}

/// The document a draft currently refers to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveReference {
    /// Canonical reference token.
    pub object_key: ObjectKey,
    /// Display file name the mention token was built from.
    pub file_name: String,
}

/// A candidate shown in the mention picker.
#[derive(Clone, Debug)]
pub struct MentionCandidate<'a> {
    /// The matching document.
    pub document: &'a Document,
    /// Whether it can be selected; documents still processing (or failed)
    /// are shown but disabled.
    pub selectable: bool,
}

/// Result of applying a selection to the draft.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    /// Rewritten draft text.
    pub draft: String,
    /// New cursor position (char index), just after the inserted token.
    pub cursor: usize,
}

/// Parses drafts for in-progress document references and holds the draft's
/// single active reference.
#[derive(Clone, Debug)]
pub struct MentionResolver {
    config: MentionConfig,
    state: MentionState,
    reference: Option<ActiveReference>,
}

impl MentionResolver {
    /// Create a resolver with the given settings.
    #[must_use]
    pub const fn new(config: MentionConfig) -> Self {
        Self {
            config,
            state: MentionState::Idle,
            reference: None,
        }
    }

    /// Resolver settings.
    #[must_use]
    pub const fn config(&self) -> &MentionConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &MentionState {
        &self.state
    }

    /// Whether a mention is being composed.
    #[must_use]
    pub const fn is_composing(&self) -> bool {
        matches!(self.state, MentionState::Composing { .. })
    }

    /// The draft's active reference, when one is held.
    #[must_use]
    pub const fn reference(&self) -> Option<&ActiveReference> {
        self.reference.as_ref()
    }

    /// Drop the active reference (after a send, or when the draft is
    /// discarded).
    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    /// Recompute the state after a draft edit or cursor move.
    pub fn update(&mut self, draft: &str, cursor: usize) {
        self.state = self.scan(draft, cursor);
    }

    /// Explicit cancel (escape action); clears the query.
    pub fn cancel(&mut self) {
        self.state = MentionState::Idle;
    }

    /// Backward scan from the cursor for a trigger satisfying the boundary,
    /// no-whitespace, and span-length constraints.
    fn scan(&self, draft: &str, cursor: usize) -> MentionState {
        let chars: Vec<char> = draft.chars().collect();
        let cursor = cursor.min(chars.len());

        // Walk back to the start of the current non-whitespace run.
        let mut start = cursor;
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
            if cursor - start > self.config.max_span_chars {
                return MentionState::Idle;
            }
        }

        // The trigger must open the run, so it sits at the text start or
        // right after whitespace; a backslash before it keeps the run from
        // starting at the trigger, which is what "escaped" means here.
        if start >= cursor || chars[start] != self.config.trigger {
            return MentionState::Idle;
        }

        MentionState::Composing {
            trigger: start,
            query: chars[start + 1..cursor].iter().collect(),
        }
    }

    /// Filter the chat's documents against the in-progress query.
    ///
    /// The file name and the object key are both matched as case-insensitive
    /// substrings; an empty query matches everything. Returns an empty list
    /// when no mention is being composed.
    #[must_use]
    pub fn candidates<'a>(&self, documents: &'a [Document]) -> Vec<MentionCandidate<'a>> {
        let MentionState::Composing { query, .. } = &self.state else {
            return Vec::new();
        };
        let needle = query.to_lowercase();
        documents
            .iter()
            .filter(|doc| {
                needle.is_empty()
                    || doc.file_name.to_lowercase().contains(&needle)
                    || doc.object_key.as_str().to_lowercase().contains(&needle)
            })
            .map(|doc| MentionCandidate {
                document: doc,
                selectable: doc.status.is_ready(),
            })
            .collect()
    }

    /// Replace the composed span with the canonical token for `document`
    /// and record it as the draft's active reference, silently replacing
    /// any prior one.
    ///
    /// Returns `None` when no mention is being composed or the document is
    /// not selectable.
    pub fn select(&mut self, draft: &str, document: &Document) -> Option<Selection> {
        let MentionState::Composing { trigger, ref query } = self.state else {
            return None;
        };
        if !document.status.is_ready() {
            return None;
        }

        let chars: Vec<char> = draft.chars().collect();
        let span_end = (trigger + 1 + query.chars().count()).min(chars.len());

        let mut rewritten: String = chars[..trigger].iter().collect();
        rewritten.push(self.config.trigger);
        rewritten.push_str(&document.file_name);
        rewritten.push(' ');
        let cursor = trigger + 2 + document.file_name.chars().count();
        rewritten.extend(&chars[span_end..]);

        self.reference = Some(ActiveReference {
            object_key: document.object_key.clone(),
            file_name: document.file_name.clone(),
        });
        self.state = MentionState::Idle;

        Some(Selection {
            draft: rewritten,
            cursor,
        })
    }
}

impl Default for MentionResolver {
    fn default() -> Self {
        Self::new(MentionConfig::default())
    }
}
