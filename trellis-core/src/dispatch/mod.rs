//! Applies [`Edit`]s to an [`AppState`], capturing undo state first.
//!
//! Every undoable edit asks the action log for the Action to record into,
//! snapshots the structure it is about to touch, and only then mutates it.
//! If no Action can be had the edit still goes ahead, just without undo.

mod automation;
mod notes;
mod song;


use crate::action_log::Direction;
use crate::edit::{DispatchResult, Edit};
use crate::error::EditError;
use crate::state::AppState;

pub fn dispatch_edit(edit: &Edit, state: &mut AppState) -> Result<DispatchResult, EditError> {
    let result = match edit {
        Edit::Note(edit) => notes::dispatch_note(edit, state),
        Edit::Automation(edit) => automation::dispatch_automation(edit, state),
        Edit::Song(edit) => song::dispatch_song(edit, state),
        Edit::Undo { allowed } => {
            let changed = state.undo(*allowed)?;
            Ok(DispatchResult {
                changed,
                ..DispatchResult::none()
            })
        }
        Edit::Redo { allowed } => {
            let changed = state.redo(*allowed)?;
            Ok(DispatchResult {
                changed,
                ..DispatchResult::none()
            })
        }
        Edit::UndoOneStep => {
            if state.in_card_routine {
                return Err(EditError::ReversionBlocked);
            }
            let has_row_edit = state.action_log.head().is_some_and(|action| {
                action.is_open()
                    && action
                        .consequences()
                        .next()
                        .is_some_and(|c| c.note_row().is_some())
            });
            let reverted_whole = state
                .action_log
                .undo_just_one_consequence_per_note_row(&mut state.song);
            Ok(DispatchResult {
                changed: has_row_edit,
                reverted_whole,
                ..DispatchResult::none()
            })
        }
        Edit::EndGesture(action_type) => {
            state.action_log.close_action(*action_type);
            Ok(DispatchResult::none())
        }
    };

    if let Err(e) = &result {
        if e.is_allocation_failure() {
            log::warn!(target: "dispatch", "edit abandoned: {}", e);
        } else {
            log::debug!(target: "dispatch", "edit refused: {}", e);
        }
    }
    result
}

/// How many Actions can currently be undone and redone.
pub fn history_depth(state: &AppState) -> (usize, usize) {
    (
        state.action_log.len(Direction::Before),
        state.action_log.len(Direction::After),
    )
}
