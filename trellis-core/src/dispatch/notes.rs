use trellis_types::{ClipId, NoteRowId};

use crate::action_log::{Action, ActionAddition, ActionType};
use crate::edit::{DispatchResult, NoteEdit};
use crate::error::EditError;
use crate::state::{AppState, NoteRow, ParamAddress};

/// How a row is snapshotted before an edit.
#[derive(Clone, Copy, PartialEq, Eq)]
enum RowRecord {
    /// Once per Action
    IfNotAlreadySnapshotted,
    /// Once per edit, so partial undo can step back through them
    Definitely,
}

/// Snapshot a row for undo, then run `edit` on it. If the edit fails the
/// snapshot is taken back out again.
fn edit_row<R>(
    state: &mut AppState,
    action_type: ActionType,
    clip: ClipId,
    row: NoteRowId,
    mode: RowRecord,
    edit: impl FnOnce(&mut NoteRow, i32) -> Result<R, EditError>,
) -> Result<(R, bool), EditError> {
    let loop_length = state
        .song
        .clip(clip)
        .ok_or(EditError::MissingClip(clip))?
        .loop_length();
    let view = state.song.view;
    let now = state.sample_timer;
    let note_row = state
        .song
        .note_row_mut(clip, row)
        .ok_or(EditError::MissingNoteRow { clip, row })?;

    let allocated = state.action_log.actions_allocated();
    let mut kept = None;
    let recording = match state
        .action_log
        .get_new_action(action_type, ActionAddition::Allowed, now, &view)
    {
        Some(action) => {
            kept = Some(action.len());
            match mode {
                RowRecord::Definitely => action
                    .record_note_array_change_definitely(clip, row, note_row.notes_mut(), false)
                    .map(|()| true),
                RowRecord::IfNotAlreadySnapshotted => action
                    .record_note_array_change_if_not_already_snapshotted(
                        clip,
                        row,
                        note_row.notes_mut(),
                        false,
                        false,
                    ),
            }
        }
        None => Ok(false),
    };
    let created_action = state.action_log.actions_allocated() != allocated;

    let outcome = recording.and_then(|recorded| edit(note_row, loop_length).map(|out| (out, recorded)));
    if let (Err(_), Some(kept)) = (&outcome, kept) {
        state.action_log.abandon_recording(kept, created_action);
    }
    outcome
}

/// Snapshot a row's notes and expression lanes.
fn record_row_with_params(
    action: &mut Action,
    clip: ClipId,
    row: NoteRowId,
    note_row: &mut NoteRow,
) -> Result<(), EditError> {
    action.record_note_array_change_if_not_already_snapshotted(
        clip,
        row,
        note_row.notes_mut(),
        false,
        false,
    )?;
    for (param, curve) in note_row.params.iter_mut() {
        action.record_param_change_if_not_already_snapshotted(
            ParamAddress::note_row(clip, row, param),
            curve,
            false,
        )?;
    }
    Ok(())
}

pub(super) fn dispatch_note(edit: &NoteEdit, state: &mut AppState) -> Result<DispatchResult, EditError> {
    match edit {
        NoteEdit::AddRow { clip } => {
            let row = state
                .song
                .clip_mut(*clip)
                .ok_or(EditError::MissingClip(*clip))?
                .add_note_row();
            Ok(DispatchResult {
                new_row: Some(row),
                ..DispatchResult::changed(false)
            })
        }
        NoteEdit::RemoveRow { clip, row } => {
            state.remove_note_row(*clip, *row)?;
            Ok(DispatchResult::changed(false))
        }
        NoteEdit::Add {
            clip,
            row,
            pos,
            length,
            velocity,
        } => {
            let (_, recorded) = edit_row(
                state,
                ActionType::NoteEdit,
                *clip,
                *row,
                RowRecord::IfNotAlreadySnapshotted,
                |note_row, loop_length| note_row.attempt_note_add(*pos, *length, *velocity, loop_length),
            )?;
            Ok(DispatchResult {
                note_pos: Some(*pos),
                ..DispatchResult::changed(recorded)
            })
        }
        NoteEdit::Delete { clip, row, pos } => {
            let (_, recorded) = edit_row(
                state,
                ActionType::NoteEdit,
                *clip,
                *row,
                RowRecord::IfNotAlreadySnapshotted,
                |note_row, _| {
                    if note_row.delete_note_at(*pos) {
                        Ok(())
                    } else {
                        Err(EditError::MissingNote(*pos))
                    }
                },
            )?;
            Ok(DispatchResult::changed(recorded))
        }
        NoteEdit::SetVelocity {
            clip,
            row,
            pos,
            velocity,
        } => {
            let (_, recorded) = edit_row(
                state,
                ActionType::NoteEdit,
                *clip,
                *row,
                RowRecord::IfNotAlreadySnapshotted,
                |note_row, _| note_row.set_velocity_at(*pos, *velocity),
            )?;
            Ok(DispatchResult {
                note_pos: Some(*pos),
                ..DispatchResult::changed(recorded)
            })
        }
        NoteEdit::Nudge {
            clip,
            row,
            pos,
            offset,
        } => {
            let (new_pos, recorded) = edit_row(
                state,
                ActionType::NoteNudge,
                *clip,
                *row,
                RowRecord::Definitely,
                |note_row, loop_length| note_row.nudge_note(*pos, *offset, loop_length),
            )?;
            Ok(DispatchResult {
                note_pos: Some(new_pos),
                ..DispatchResult::changed(recorded)
            })
        }
        NoteEdit::ClearRegion {
            clip,
            row,
            pos,
            length,
        } => {
            let (removed, recorded) = edit_row(
                state,
                ActionType::NoteEdit,
                *clip,
                *row,
                RowRecord::IfNotAlreadySnapshotted,
                |note_row, loop_length| {
                    if *length <= 0 || *pos < 0 {
                        return Err(EditError::InvalidRegion {
                            pos: *pos,
                            length: *length,
                            loop_length,
                        });
                    }
                    Ok(note_row.delete_notes_in_region(*pos, *length, loop_length))
                },
            )?;
            if removed == 0 {
                return Ok(DispatchResult {
                    recorded,
                    ..DispatchResult::none()
                });
            }
            Ok(DispatchResult::changed(recorded))
        }
        NoteEdit::ShiftRow { clip, row, amount } => shift_row(state, *clip, *row, *amount),
    }
}

/// Shifting moves the row's expression lanes too, so those are snapshotted
/// alongside the notes.
fn shift_row(
    state: &mut AppState,
    clip: ClipId,
    row: NoteRowId,
    amount: i32,
) -> Result<DispatchResult, EditError> {
    let loop_length = state
        .song
        .clip(clip)
        .ok_or(EditError::MissingClip(clip))?
        .loop_length();
    let view = state.song.view;
    let now = state.sample_timer;
    let note_row = state
        .song
        .note_row_mut(clip, row)
        .ok_or(EditError::MissingNoteRow { clip, row })?;

    let allocated = state.action_log.actions_allocated();
    let mut recorded = false;
    if let Some(action) = state
        .action_log
        .get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, now, &view)
    {
        let kept = action.len();
        if let Err(e) = record_row_with_params(action, clip, row, note_row) {
            let created_action = state.action_log.actions_allocated() != allocated;
            state.action_log.abandon_recording(kept, created_action);
            return Err(e);
        }
        recorded = true;
    }

    note_row.shift_horizontal(amount, loop_length);
    Ok(DispatchResult::changed(recorded))
}
