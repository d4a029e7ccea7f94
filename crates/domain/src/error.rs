//! Common error types used across the workspace.
//!
//! Every fallible operation in the core returns [`AutomationError`]. Adapters
//! define their own typed errors and convert into it with `From`.

use crate::result::ActionStatus;

/// Top-level error taxonomy for the automation core.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    /// A caller supplied a value that breaks a domain invariant.
    #[error("invalid argument")]
    InvalidArgument(#[from] ValidationError),

    /// The referenced rule, template, host or device does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// An item with the same identifier is already registered.
    #[error(transparent)]
    AlreadyExists(#[from] AlreadyExistsError),

    /// A bounded table or queue is full.
    #[error("{resource} is full (capacity {capacity})")]
    ResourceExhausted {
        resource: &'static str,
        capacity: usize,
    },

    /// An operation did not complete within its deadline.
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The request names a capability that is not available.
    #[error("unsupported {kind}: {value}")]
    Unsupported { kind: &'static str, value: String },

    /// A sequence run with stop-on-error hit a non-successful action.
    #[error("sequence aborted at action #{index} with status {status}")]
    SequenceAborted { index: usize, status: ActionStatus },

    /// An executor failed for a reason outside the taxonomy above.
    #[error("internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The persistence layer failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AutomationError {
    /// Shorthand for [`AutomationError::ResourceExhausted`].
    #[must_use]
    pub fn exhausted(resource: &'static str, capacity: usize) -> Self {
        Self::ResourceExhausted { resource, capacity }
    }

    /// Shorthand for [`AutomationError::Unsupported`].
    #[must_use]
    pub fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Unsupported {
            kind,
            value: value.into(),
        }
    }
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An identifier was empty.
    #[error("identifier must not be empty")]
    EmptyId,

    /// An identifier or variable name exceeds the storage limit.
    #[error("identifier is {len} bytes long, at most {max} allowed")]
    IdTooLong { len: usize, max: usize },

    /// A display name exceeds the storage limit.
    #[error("name is {len} bytes long, at most {max} allowed")]
    NameTooLong { len: usize, max: usize },

    /// A template was built without an action.
    #[error("an action is required")]
    MissingAction,

    /// A sequence was requested with no actions.
    #[error("action sequence must not be empty")]
    EmptySequence,

    /// An SSH host entry has no address.
    #[error("host address must not be empty")]
    EmptyHost,

    /// A color string could not be parsed.
    #[error("invalid color {0:?}")]
    InvalidColor(String),

    /// An operator string could not be parsed.
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),
}

/// Lookup failure carrying the kind of item and its identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} '{id}' not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Duplicate registration carrying the kind of item and its identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} '{id}' already exists")]
pub struct AlreadyExistsError {
    pub entity: &'static str,
    pub id: String,
}
