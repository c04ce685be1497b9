//! Error kinds raised synchronously by the component that detects them.
//!
//! Mirrors the teacher's own preference for small hand-rolled error types (see
//! `TryFromStrategyBuilderError` / `TryFromGenotypeBuilderError` in the upstream crate) rather than
//! pulling in `thiserror`: every variant here is a plain data carrier with `Display` written by
//! hand.
use std::fmt;

/// Error kinds raised synchronously by the component that detects them (see the error handling
/// design section of the spec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GaError {
    /// A mandatory collaborator is absent at an API boundary.
    NullArgument(&'static str),
    /// An operation was attempted on a wrongly-staged object (e.g. restoring a shuffle without a
    /// backup, reconfiguring a connected stub's id).
    InvalidOperation(&'static str),
    /// A size, index, or probability fell outside its admissible range.
    ArgumentOutOfRange(&'static str),
    /// A fixed-size container refused an insertion.
    Full,
    /// A data store `add` targeted an id that already exists in the scope.
    Duplicate,
    /// A data store or group lookup found nothing at the given key.
    NotFound,
    /// A data store `get` found a value whose type does not match the requested type.
    TypeMismatch,
    /// An operator reported it could not produce a result; the scheduler cancels the generation.
    OperationFailure(String),
    /// The scheduler observed `stop()` and unwound the in-flight generation.
    Cancelled,
}

impl fmt::Display for GaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaError::NullArgument(what) => write!(f, "null argument: {what}"),
            GaError::InvalidOperation(what) => write!(f, "invalid operation: {what}"),
            GaError::ArgumentOutOfRange(what) => write!(f, "argument out of range: {what}"),
            GaError::Full => write!(f, "container is full"),
            GaError::Duplicate => write!(f, "duplicate key"),
            GaError::NotFound => write!(f, "not found"),
            GaError::TypeMismatch => write!(f, "type mismatch"),
            GaError::OperationFailure(msg) => write!(f, "operation failure: {msg}"),
            GaError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for GaError {}

pub type GaResult<T> = Result<T, GaError>;
