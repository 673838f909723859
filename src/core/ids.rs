//! Identifier types for the synchronization core.
//!
//! Chat identifiers and object keys are server-issued and opaque; the
//! newtypes here only enforce that they are plausible key material before
//! they travel through cache keys and URL paths. `MutationId` is a local
//! correlation identifier for log lines spanning one mutation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned when validating a server-issued identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Empty (or whitespace-only) identifier.
    #[error("identifier must not be empty")]
    Empty,
    /// Exceeds the maximum accepted length.
    #[error("identifier too long: got {got}, max {max}")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains a control or whitespace character.
    #[error("identifier contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
}

/// Declare a validated string-key newtype with a consistent API.
macro_rules! define_key_string {
    (
        $(#[$meta:meta])*
        $name:ident,
        max_len = $max:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Hard ceiling to prevent pathological payloads.
            pub const MAX_LEN: usize = $max;

            /// Build a validated identifier.
            ///
            /// Rules: non-empty after trimming, bounded length, and no
            /// control or whitespace characters.
            ///
            /// # Errors
            /// Returns `IdError` if the input is empty, too long, or
            /// contains invalid characters.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
                let s = raw.as_ref().trim();

                if s.is_empty() {
                    return Err(IdError::Empty);
                }
                if s.len() > Self::MAX_LEN {
                    return Err(IdError::TooLong {
                        max: Self::MAX_LEN,
                        got: s.len(),
                    });
                }

                for (i, ch) in s.chars().enumerate() {
                    if ch.is_control() || ch.is_whitespace() {
                        return Err(IdError::InvalidChar { ch, index: i });
                    }
                }

                Ok(Self(s.to_owned()))
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into `String`.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.into_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

define_key_string!(
    /// Server-issued identifier of a chat, ordered by creation.
    ChatId,
    max_len = 64
);

define_key_string!(
    /// Stable server-assigned key of an uploaded or generated file.
    ///
    /// Distinct from the display file name; this is the canonical token a
    /// mention resolves to.
    ObjectKey,
    max_len = 512
);

/// Correlation identifier for one in-flight mutation.
///
/// Appears in every log line a mutation produces, so optimistic apply,
/// reconciliation, and rollback can be tied together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Create a new random mutation identifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
