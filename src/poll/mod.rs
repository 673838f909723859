//! Background polling and transition notification.
//!
//! - `poller`: per-(resource, chat) refresh loops with cancellable handles
//! - `notifier`: snapshot diffing into user-facing transition events

pub mod notifier;
pub mod poller;

pub use notifier::{TransitionEvent, TransitionNotifier};
pub use poller::Poller;
