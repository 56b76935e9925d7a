//! Edit commands understood by [`crate::dispatch::dispatch_edit`].

use trellis_types::{ClipId, NoteRowId, ParamId, Pos};

use crate::action_log::ActionType;
use crate::state::ParamAddress;

#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Note(NoteEdit),
    Automation(AutomationEdit),
    Song(SongEdit),
    /// `allowed` is whether the current interaction permits reverting
    Undo { allowed: bool },
    Redo { allowed: bool },
    /// Step back one micro-edit within the open Action
    UndoOneStep,
    /// The gesture that was coalescing edits of this type has ended
    EndGesture(ActionType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEdit {
    AddRow {
        clip: ClipId,
    },
    RemoveRow {
        clip: ClipId,
        row: NoteRowId,
    },
    Add {
        clip: ClipId,
        row: NoteRowId,
        pos: Pos,
        length: i32,
        velocity: u8,
    },
    Delete {
        clip: ClipId,
        row: NoteRowId,
        pos: Pos,
    },
    SetVelocity {
        clip: ClipId,
        row: NoteRowId,
        pos: Pos,
        velocity: u8,
    },
    /// Move one note by a tick or so. Each nudge is its own partial-undo step.
    Nudge {
        clip: ClipId,
        row: NoteRowId,
        pos: Pos,
        offset: i32,
    },
    ClearRegion {
        clip: ClipId,
        row: NoteRowId,
        pos: Pos,
        length: i32,
    },
    /// Rotate a row's notes and expression within the loop
    ShiftRow {
        clip: ClipId,
        row: NoteRowId,
        amount: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEdit {
    /// Make a parameter available, unautomated at `value`
    AddParam { target: ParamAddress, value: i32 },
    RemoveParam(ParamAddress),
    SetRegion {
        target: ParamAddress,
        pos: Pos,
        length: i32,
        value: i32,
    },
    SetNode {
        target: ParamAddress,
        pos: Pos,
        value: i32,
        interpolated: bool,
    },
    DeleteRegion {
        target: ParamAddress,
        pos: Pos,
        length: i32,
    },
    Clear(ParamAddress),
    /// Knob turn. Unautomated parameters change their value (undoably);
    /// automated ones are overridden during playback, and with `record` the
    /// value is written at the play position.
    KnobTurn {
        target: ParamAddress,
        value: i32,
        record: bool,
    },
    ShiftValues { target: ParamAddress, offset: i32 },
    ShiftHorizontally { target: ParamAddress, amount: i32 },
    /// Move the nodes of one region to another, re-keyed
    MoveRegion {
        target: ParamAddress,
        from: Pos,
        length: i32,
        to: Pos,
    },
    DeleteTime {
        target: ParamAddress,
        start: Pos,
        length: i32,
    },
    InsertTime {
        target: ParamAddress,
        pos: Pos,
        length: i32,
    },
    Copy {
        target: ParamAddress,
        start: Pos,
        end: Pos,
    },
    Paste {
        target: ParamAddress,
        start: Pos,
        end: Pos,
        scale_factor: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongEdit {
    AddClip { loop_length: Option<i32> },
    RemoveClip(ClipId),
    SetSwing(i8),
    SetTempo(u64),
    SetClipLength { clip: ClipId, length: i32 },
}

/// What a dispatched edit did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    /// The song changed
    pub changed: bool,
    /// The change was captured for undo
    pub recorded: bool,
    /// Position a note edit ended up at
    pub note_pos: Option<Pos>,
    pub new_clip: Option<ClipId>,
    pub new_row: Option<NoteRowId>,
    /// A partial undo took the whole Action
    pub reverted_whole: bool,
}

impl DispatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn changed(recorded: bool) -> Self {
        Self {
            changed: true,
            recorded,
            ..Self::default()
        }
    }
}

/// Patch cable depths are bipolar and stored at half resolution in
/// copies. Parameters at or above this id are cables.
pub const FIRST_PATCH_CABLE_PARAM: ParamId = ParamId::new(0x8000);
