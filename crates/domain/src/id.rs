//! Typed identifier newtypes.
//!
//! Rules, templates and SSH hosts are addressed by short, user-chosen string
//! keys. Queued jobs get a random UUID.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest identifier (and variable name) accepted, in bytes.
pub const MAX_KEY_LEN: usize = 31;

/// Check that `value` is usable as a key: non-empty and at most
/// [`MAX_KEY_LEN`] bytes.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyId`] or [`ValidationError::IdTooLong`].
pub fn validate_key(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if value.len() > MAX_KEY_LEN {
        return Err(ValidationError::IdTooLong {
            len: value.len(),
            max: MAX_KEY_LEN,
        });
    }
    Ok(())
}

macro_rules! define_key {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a key.
            ///
            /// # Errors
            ///
            /// Returns a [`ValidationError`] when the key is empty or too long.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                validate_key(&value)?;
                Ok(Self(value))
            }

            /// Borrow the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_key!(
    /// Identifier of a [`Rule`](crate::automation::Rule).
    RuleId
);

define_key!(
    /// Identifier of an [`ActionTemplate`](crate::template::ActionTemplate).
    TemplateId
);

define_key!(
    /// Identifier of an [`SshHost`](crate::ssh_host::SshHost).
    HostId
);

/// Unique identifier of an entry in the asynchronous action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(uuid::Uuid);

impl Default for JobId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl JobId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the inner UUID.
    #[must_use]
    pub fn as_uuid(self) -> uuid::Uuid {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
