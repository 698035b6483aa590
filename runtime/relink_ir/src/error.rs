//! Error taxonomy for the invocation-plan core.
//!
//! Structural precondition violations are programmer errors: they abort
//! the edit and surface to the caller, and are never retried. Cache races
//! and staleness are internal and self-healing, so no error variant
//! exists for them.

use crate::slot::SlotKind;

/// A call signature could not be represented.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The signature's parameter slot total exceeds the fixed limit that
    /// downstream physical calling sequences can address.
    #[error("signature requires {slots} parameter slots, limit is {max}")]
    ArityExceeded { slots: u32, max: u32 },
}

/// A plan edit violated the editing contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// `start_edit` called while a transaction was already open.
    #[error("edit transaction already open")]
    AlreadyEditing,

    /// A buffer operation was called outside an open transaction.
    #[error("no edit transaction open")]
    NotEditing,

    /// A position was rewritten twice within one transaction.
    #[error("position {index} already rewritten in this transaction")]
    DoubleEdit { index: usize },

    /// A structural precondition did not hold (bad position, kind
    /// mismatch, heterogeneous spread, invalid reorder, ...).
    #[error("invalid structural edit: {detail}")]
    InvalidStructuralEdit { detail: String },
}

impl EditError {
    /// Shorthand for [`EditError::InvalidStructuralEdit`].
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidStructuralEdit {
            detail: detail.into(),
        }
    }
}

/// A plan or combiner could not be evaluated against concrete values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// Wrong number of arguments supplied to a plan or combiner.
    #[error("wrong argument count: expected {expected}, found {found}")]
    ArgCountMismatch { expected: usize, found: usize },

    /// An argument or produced value had the wrong slot kind.
    #[error("kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: SlotKind, found: SlotKind },

    /// A capture accessor ran against a value that is not a capture
    /// record.
    #[error("position 0 does not carry a capture record")]
    NotACaptureRecord,

    /// A capture accessor read past the end of the capture record.
    #[error("capture index {index} out of bounds for record of {len}")]
    CaptureOutOfBounds { index: usize, len: usize },

    /// An array operation ran against a value that is not an array.
    #[error("value is not an array")]
    NotAnArray,

    /// An element read past the end of an array.
    #[error("element index {index} out of bounds for array of {len}")]
    ElementOutOfBounds { index: usize, len: usize },

    /// A spread array's length did not match the spread count.
    #[error("spread length mismatch: expected {expected}, found {found}")]
    SpreadLengthMismatch { expected: usize, found: usize },

    /// A combiner reported a failure of its own.
    #[error("combiner failed: {message}")]
    Combiner { message: String },
}
