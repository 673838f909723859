//! Document-mention resolution over text drafts.
//!
//! - `resolver`: state machine, candidate filtering, and token insertion
//! - `submit`: draft-to-payload transform applied at submission time

pub mod resolver;
pub mod submit;

pub use resolver::{
    ActiveReference, MentionCandidate, MentionResolver, MentionState, Selection,
};
pub use submit::OutgoingMessage;
