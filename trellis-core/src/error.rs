use std::path::PathBuf;

use thiserror::Error;
use trellis_types::{ClipId, NoteRowId, ParamId, SequenceError};

/// Why an edit, undo or redo could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("clip {0} not found")]
    MissingClip(ClipId),

    #[error("note row {row} not found in clip {clip}")]
    MissingNoteRow { clip: ClipId, row: NoteRowId },

    #[error("parameter {0} not found")]
    MissingParam(ParamId),

    /// Reversion is not allowed right now, either because the storage
    /// routine is running or the caller's gate is closed.
    #[error("undo/redo is blocked")]
    ReversionBlocked,

    #[error("invalid region: pos {pos}, length {length}, loop length {loop_length}")]
    InvalidRegion {
        pos: i32,
        length: i32,
        loop_length: i32,
    },

    /// The position is already occupied by a note.
    #[error("position {0} is already occupied")]
    Occupied(i32),

    #[error("no note at position {0}")]
    MissingNote(i32),
}

impl EditError {
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, EditError::Sequence(SequenceError::AllocationFailure))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
