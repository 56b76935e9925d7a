use trellis_types::{ClipId, NoteRowId, NoteSequence};

use super::Direction;
use crate::automation::CurveState;
use crate::state::{ParamAddress, ParamCollection, Song};

/// One reversible change to one structure.
///
/// Sequence-owning variants hold the other side of a swap: before the first
/// revert that is the state prior to the edit, afterwards it is whatever the
/// live structure held when it was reverted.
#[derive(Debug, Clone)]
pub enum Consequence {
    ParamChange {
        target: ParamAddress,
        snapshot: CurveState,
    },
    NoteArrayChange {
        clip: ClipId,
        row: NoteRowId,
        notes: NoteSequence,
        /// Recorded unconditionally, one per micro-edit, rather than only
        /// for the first edit of the row.
        definite: bool,
    },
    SwingChange {
        swing: [i8; 2],
    },
    TempoChange {
        time_per_big: [u64; 2],
    },
    ClipLength {
        clip: ClipId,
        length: i32,
    },
}

/// A structure that is going away, for dropping the consequences that
/// refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Clip(ClipId),
    NoteRow(ClipId, NoteRowId),
    Param(ParamAddress),
}

impl Consequence {
    /// Swap the recorded state into the song. A consequence whose target
    /// no longer exists does nothing.
    pub fn revert(&mut self, direction: Direction, song: &mut Song) {
        match self {
            Consequence::ParamChange { target, snapshot } => match song.curve_mut(target) {
                Some(curve) => curve.swap_state(snapshot),
                None => {
                    log::debug!(target: "action_log", "param {} is gone, skipping revert", target);
                }
            },
            Consequence::NoteArrayChange {
                clip, row, notes, ..
            } => match song.note_row_mut(*clip, *row) {
                Some(note_row) => note_row.notes_mut().swap_with(notes),
                None => {
                    log::debug!(target: "action_log", "clip {} row {} is gone, skipping revert", clip, row);
                }
            },
            Consequence::SwingChange { swing } => {
                song.swing = swing[direction.index()];
            }
            Consequence::TempoChange { time_per_big } => {
                song.time_per_big = time_per_big[direction.index()];
            }
            Consequence::ClipLength { clip, length } => match song.clip_mut(*clip) {
                Some(live) => std::mem::swap(&mut live.loop_length, length),
                None => {
                    log::debug!(target: "action_log", "clip {} is gone, skipping revert", clip);
                }
            },
        }
    }

    /// The note row this consequence snapshots, if any.
    pub fn note_row(&self) -> Option<(ClipId, NoteRowId)> {
        match self {
            Consequence::NoteArrayChange { clip, row, .. } => Some((*clip, *row)),
            _ => None,
        }
    }

    pub fn param(&self) -> Option<&ParamAddress> {
        match self {
            Consequence::ParamChange { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether this consequence refers to `target` or to something owned
    /// by it.
    pub fn refers_to(&self, target: &Target) -> bool {
        match (self, target) {
            (Consequence::ParamChange { target: address, .. }, Target::Param(gone)) => {
                address == gone
            }
            (Consequence::ParamChange { target: address, .. }, Target::NoteRow(clip, row)) => {
                address.collection == ParamCollection::NoteRow(*clip, *row)
            }
            (Consequence::ParamChange { target: address, .. }, Target::Clip(clip)) => {
                address.collection.clip() == Some(*clip)
            }
            (Consequence::NoteArrayChange { clip, row, .. }, Target::NoteRow(gone_clip, gone_row)) => {
                clip == gone_clip && row == gone_row
            }
            (Consequence::NoteArrayChange { clip, .. }, Target::Clip(gone)) => clip == gone,
            (Consequence::ClipLength { clip, .. }, Target::Clip(gone)) => clip == gone,
            _ => false,
        }
    }
}
