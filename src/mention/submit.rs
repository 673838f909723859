//! Submission transform from a draft to an outgoing payload.
//!
//! When the draft holds an active reference, the canonical mention token
//! is stripped from the text and the payload gains a structured prefix
//! carrying the document's object key; otherwise the trimmed draft is sent
//! verbatim.

use regex::Regex;

use crate::core::ids::ObjectKey;
use crate::mention::resolver::MentionResolver;

/// Payload produced from a draft at submission time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutgoingMessage {
    /// Text sent to the remote agent, including any document prefix.
    pub payload: String,
    /// The referenced document's object key, when one was held.
    pub reference: Option<ObjectKey>,
}

impl MentionResolver {
    /// Build the outgoing payload for the current draft.
    ///
    /// Returns `None` when the remaining text is empty after trimming (and
    /// token stripping); such drafts are rejected locally without a remote
    /// call.
    #[must_use]
    pub fn submission(&self, draft: &str) -> Option<OutgoingMessage> {
        match self.reference() {
            None => {
                let text = draft.trim();
                if text.is_empty() {
                    return None;
                }
                Some(OutgoingMessage {
                    payload: text.to_string(),
                    reference: None,
                })
            }
            Some(reference) => {
                let stripped = strip_mention_token(
                    draft,
                    self.config().trigger,
                    &reference.file_name,
                );
                let text = stripped.trim();
                if text.is_empty() {
                    return None;
                }
                Some(OutgoingMessage {
                    payload: format!("[document: {}] {}", reference.object_key, text),
                    reference: Some(reference.object_key.clone()),
                })
            }
        }
    }
}

/// Remove every exact, case-insensitive occurrence of `@<file name>` at a
/// word boundary, collapsing the double spaces stripping leaves behind.
fn strip_mention_token(draft: &str, trigger: char, file_name: &str) -> String {
    let pattern = format!(
        r"(?i)(^|\s){}{}($|\s)",
        regex::escape(&trigger.to_string()),
        regex::escape(file_name)
    );
    let Ok(token) = Regex::new(&pattern) else {
        return draft.to_string();
    };

    let mut text = draft.to_string();
    // One replacement per pass; each pass shortens the string, so this
    // terminates. A single pass would miss back-to-back tokens whose
    // separating whitespace the previous match consumed.
    loop {
        let replaced = token.replace(&text, "${1}${2}").into_owned();
        if replaced == text {
            break;
        }
        text = replaced;
    }
    collapse_double_spaces(&text)
}

fn collapse_double_spaces(text: &str) -> String {
    let mut collapsed = text.to_string();
    while collapsed.contains("  ") {
        collapsed = collapsed.replace("  ", " ");
    }
    collapsed
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::mention::resolver::MentionResolver;

    fn resolver_with_reference(file_name: &str, key: &str) -> MentionResolver {
        let doc = ScriptedApi::indexed_document(key, file_name);
        let mut resolver = MentionResolver::default();
        resolver.update("@x", 2);
        // Selection outcome is irrelevant here; only the recorded
        // reference matters for the submission transform.
        resolver.select("@x", &doc).unwrap();
        resolver
    }

    #[test]
    fn test_verbatim_without_reference() {
        let resolver = MentionResolver::default();
        let outgoing = resolver.submission("  Hello there  ").unwrap();
        assert_eq!(outgoing.payload, "Hello there");
        assert!(outgoing.reference.is_none());
    }

    #[test]
    fn test_empty_draft_rejected() {
        let resolver = MentionResolver::default();
        assert!(resolver.submission("").is_none());
        assert!(resolver.submission("   \t ").is_none());
    }

    #[test]
    fn test_token_stripped_and_prefixed() {
        let resolver = resolver_with_reference("notes.pdf", "user-1/7/notes.pdf");
        let outgoing = resolver
            .submission("summarize @notes.pdf for tomorrow")
            .unwrap();
        assert_eq!(
            outgoing.payload,
            "[document: user-1/7/notes.pdf] summarize for tomorrow"
        );
        assert_eq!(
            outgoing.reference.as_ref().map(|k| k.as_str()),
            Some("user-1/7/notes.pdf")
        );
    }

    #[test]
    fn test_token_stripping_is_case_insensitive() {
        let resolver = resolver_with_reference("notes.pdf", "user-1/7/notes.pdf");
        let outgoing = resolver.submission("@Notes.PDF what changed?").unwrap();
        assert_eq!(
            outgoing.payload,
            "[document: user-1/7/notes.pdf] what changed?"
        );
    }

    #[test]
    fn test_no_double_spaces_after_stripping() {
        let resolver = resolver_with_reference("notes.pdf", "user-1/7/notes.pdf");
        let outgoing = resolver
            .submission("compare @notes.pdf against last week")
            .unwrap();
        assert!(!outgoing.payload.contains("  "));
    }

    #[test]
    fn test_partial_name_match_is_left_alone() {
        let resolver = resolver_with_reference("notes.pdf", "user-1/7/notes.pdf");
        let outgoing = resolver.submission("@notes.pdfx stays, @notes.pdf goes").unwrap();
        assert!(outgoing.payload.contains("@notes.pdfx stays"));
        assert!(!outgoing.payload.contains("@notes.pdf goes"));
    }

    #[test]
    fn test_mention_only_draft_rejected() {
        let resolver = resolver_with_reference("notes.pdf", "user-1/7/notes.pdf");
        assert!(resolver.submission("@notes.pdf ").is_none());
    }

    #[test]
    fn test_round_trip_select_then_submit() {
        let doc = ScriptedApi::indexed_document("user-1/7/notes.pdf", "notes.pdf");
        let mut resolver = MentionResolver::default();
        let draft = "summarize @no";
        resolver.update(draft, draft.chars().count());
        let selection = resolver.select(draft, &doc).unwrap();

        let outgoing = resolver.submission(&selection.draft).unwrap();
        assert_eq!(outgoing.payload, "[document: user-1/7/notes.pdf] summarize");
        assert!(!outgoing.payload.contains('@'));
        assert!(!outgoing.payload.contains("  "));
    }
}
