//! # trellis-types
//!
//! Data types shared by the trellis sequencer core: the position-ordered
//! sequence container, the automation [`Node`] and [`Note`] element types,
//! id newtypes and the scalar song-view snapshot.
//!
//! Nothing in here knows about undo. The undo engine and the automation
//! behaviour live in `trellis-core`.

mod error;
mod node;
mod note;
pub mod sequence;
mod view;

pub use error::SequenceError;
pub use node::Node;
pub use note::{Iterance, Note, NoteSequence, DEFAULT_LIFT, DEFAULT_VELOCITY, PROBABILITY_ALWAYS};
pub use sequence::{Comparison, Keyed, PositionIndexedSequence};
pub use view::ViewState;

/// A position on the timeline, in ticks. Loop-relative positions are always
/// in `0..loop_length`.
pub type Pos = i32;

/// Running count of audio samples since startup.
pub type SampleTime = u64;

/// Unique identifier for a clip.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ClipId(u32);

impl ClipId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a note row within a clip. Ids are never reused inside a
/// clip, so a stale id can only miss, never alias a newer row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NoteRowId(u32);

impl NoteRowId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NoteRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an automatable parameter within a parameter collection.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct ParamId(u16);

impl ParamId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }
    pub fn get(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}
