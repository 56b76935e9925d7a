//! Undo/redo engine.
//!
//! An [`Action`] is one undo step: a list of [`Consequence`]s, newest first,
//! plus the song view before and after. Each consequence owns a detached
//! snapshot of one live structure; reverting swaps snapshot and live data,
//! so the same record serves for both undo and redo.
//!
//! [`ActionLog`] keeps the undo and redo stacks. Only the newest undo
//! Action can be open, and only an open Action accepts more consequences.

mod action;
mod consequence;
mod history;

#[cfg(test)]
mod tests;

pub use action::{Action, ActionState};
pub use consequence::{Consequence, Target};
pub use history::ActionLog;

/// Which way a revert goes. Also indexes the before/after halves of
/// recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Undo: bring back the state from before the Action
    Before,
    /// Redo
    After,
}

impl Direction {
    pub fn other(self) -> Self {
        match self {
            Direction::Before => Direction::After,
            Direction::After => Direction::Before,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Before => 0,
            Direction::After => 1,
        }
    }
}

/// Kind of user edit an Action groups. Consecutive edits of the same kind
/// may coalesce into one Action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Misc,
    NoteEdit,
    NoteNudge,
    AutomationEdit,
    ParamUnautomatedValueChange,
    Record,
    SwingChange,
    TempoChange,
    ClipLength,
    Paste,
}

/// Whether a new edit may join the open Action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionAddition {
    NotAllowed,
    Allowed,
    /// Only if the open Action was created at the same sample time
    AllowedIfCreatedJustNow,
}
