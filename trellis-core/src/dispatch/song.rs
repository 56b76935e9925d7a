use trellis_types::ClipId;

use crate::action_log::{Action, ActionAddition, ActionType, Direction};
use crate::edit::{DispatchResult, SongEdit};
use crate::error::EditError;
use crate::state::{AppState, Clip, ParamAddress, MAX_SWING};

pub(super) fn dispatch_song(edit: &SongEdit, state: &mut AppState) -> Result<DispatchResult, EditError> {
    match edit {
        SongEdit::AddClip { loop_length } => {
            let loop_length = loop_length.unwrap_or_else(|| state.config.default_loop_length());
            if loop_length <= 0 {
                return Err(EditError::InvalidRegion {
                    pos: 0,
                    length: loop_length,
                    loop_length,
                });
            }
            let clip = state.song.add_clip(loop_length);
            Ok(DispatchResult {
                new_clip: Some(clip),
                ..DispatchResult::changed(false)
            })
        }
        SongEdit::RemoveClip(clip) => {
            state.remove_clip(*clip)?;
            Ok(DispatchResult::changed(false))
        }
        SongEdit::SetSwing(swing) => {
            let before = state.song.swing;
            let after = (*swing).clamp(-MAX_SWING, MAX_SWING);
            if before == after {
                return Ok(DispatchResult::none());
            }
            let view = state.song.view;
            state
                .action_log
                .record_swing_change(before, after, state.sample_timer, &view)?;
            state.song.swing = after;
            Ok(DispatchResult::changed(true))
        }
        SongEdit::SetTempo(time_per_big) => {
            let before = state.song.time_per_big;
            let after = (*time_per_big).max(1);
            if before == after {
                return Ok(DispatchResult::none());
            }
            let view = state.song.view;
            state
                .action_log
                .record_tempo_change(before, after, state.sample_timer, &view)?;
            state.song.time_per_big = after;
            Ok(DispatchResult::changed(true))
        }
        SongEdit::SetClipLength { clip, length } => set_clip_length(state, *clip, *length),
    }
}

/// Growing a clip repeats its content and shrinking trims it, so every row
/// and curve of the clip is snapshotted along with the length.
fn set_clip_length(state: &mut AppState, clip_id: ClipId, length: i32) -> Result<DispatchResult, EditError> {
    let view = state.song.view;
    let now = state.sample_timer;
    let clip = state
        .song
        .clip_mut(clip_id)
        .ok_or(EditError::MissingClip(clip_id))?;
    if length <= 0 {
        return Err(EditError::InvalidRegion {
            pos: 0,
            length,
            loop_length: clip.loop_length(),
        });
    }
    if length == clip.loop_length() {
        return Ok(DispatchResult::none());
    }

    let allocated = state.action_log.actions_allocated();
    let mut recorded = false;
    if let Some(action) = state
        .action_log
        .get_new_action(ActionType::ClipLength, ActionAddition::NotAllowed, now, &view)
    {
        let kept = action.len();
        if let Err(e) = record_clip_contents(action, clip_id, clip) {
            let created_action = state.action_log.actions_allocated() != allocated;
            state.action_log.abandon_recording(kept, created_action);
            return Err(e);
        }
        recorded = true;
    }

    if let Err(e) = clip.set_loop_length(length) {
        if recorded {
            // Put back whatever rows were already repeated or trimmed
            state.action_log.revert(Direction::Before, &mut state.song);
            state.action_log.delete_log(Direction::After);
        } else {
            log::warn!(target: "dispatch", "clip {} length change failed part way: {}", clip_id, e);
        }
        return Err(e);
    }
    Ok(DispatchResult::changed(recorded))
}

/// Snapshot everything a loop length change can rewrite: the clip's curves,
/// each row's notes and curves, and the length itself.
fn record_clip_contents(action: &mut Action, clip_id: ClipId, clip: &mut Clip) -> Result<(), EditError> {
    for (param, curve) in clip.params.iter_mut() {
        action.record_param_change_if_not_already_snapshotted(
            ParamAddress::clip(clip_id, param),
            curve,
            false,
        )?;
    }
    for row in clip.note_rows_mut() {
        let row_id = row.id();
        action.record_note_array_change_if_not_already_snapshotted(
            clip_id,
            row_id,
            row.notes_mut(),
            false,
            false,
        )?;
        for (param, curve) in row.params.iter_mut() {
            action.record_param_change_if_not_already_snapshotted(
                ParamAddress::note_row(clip_id, row_id, param),
                curve,
                false,
            )?;
        }
    }
    action.record_clip_length_change(clip_id, clip.loop_length())
}
