use std::collections::TryReserveError;

use thiserror::Error;

/// Failures from growing or validating a [`PositionIndexedSequence`].
///
/// [`PositionIndexedSequence`]: crate::PositionIndexedSequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// The backing storage could not grow. The sequence is unchanged.
    #[error("insufficient memory to grow sequence")]
    AllocationFailure,

    /// An element would break the strict key ordering required by the caller.
    #[error("key {key} at index {index} breaks strict ordering")]
    InvariantViolation { index: usize, key: i32 },
}

impl From<TryReserveError> for SequenceError {
    fn from(_: TryReserveError) -> Self {
        SequenceError::AllocationFailure
    }
}
