use crate::action_log::{ActionAddition, ActionType};
use crate::automation::{AutomationCurve, StolenNodes};
use crate::edit::{AutomationEdit, DispatchResult, FIRST_PATCH_CABLE_PARAM};
use crate::error::EditError;
use crate::state::{AppState, ParamAddress};

fn loop_length_of(state: &AppState, target: &ParamAddress) -> Result<i32, EditError> {
    let default_length = state.config.default_loop_length();
    match target.collection.clip() {
        Some(clip) => state
            .song
            .loop_length_for(target.collection, default_length)
            .ok_or(EditError::MissingClip(clip)),
        None => Ok(default_length),
    }
}

fn is_patch_cable(target: &ParamAddress) -> bool {
    target.param >= FIRST_PATCH_CABLE_PARAM
}

/// Snapshot a curve for undo, then run `edit` on it. `steal` moves the
/// nodes into the snapshot instead of copying them, for edits that discard
/// them anyway.
fn edit_curve<R>(
    state: &mut AppState,
    action_type: ActionType,
    addition: ActionAddition,
    target: ParamAddress,
    steal: bool,
    edit: impl FnOnce(&mut AutomationCurve, i32) -> Result<R, EditError>,
) -> Result<(R, bool), EditError> {
    let loop_length = loop_length_of(state, &target)?;
    let view = state.song.view;
    let now = state.sample_timer;
    let curve = state
        .song
        .curve_mut(&target)
        .ok_or(EditError::MissingParam(target.param))?;

    let allocated = state.action_log.actions_allocated();
    let mut kept = None;
    let recorded = match state
        .action_log
        .get_new_action(action_type, addition, now, &view)
    {
        Some(action) => {
            kept = Some(action.len());
            action.record_param_change_if_not_already_snapshotted(target, curve, steal)
        }
        None => Ok(false),
    };
    let created_action = state.action_log.actions_allocated() != allocated;
    let recorded = match recorded {
        Ok(recorded) => recorded,
        Err(e) => {
            if let Some(kept) = kept {
                state.action_log.abandon_recording(kept, created_action);
            }
            return Err(e);
        }
    };

    match edit(curve, loop_length) {
        Ok(out) => Ok((out, recorded)),
        Err(e) => {
            // A stolen snapshot holds the only copy of the nodes, so it stays
            if let (false, Some(kept)) = (steal, kept) {
                state.action_log.abandon_recording(kept, created_action);
            }
            Err(e)
        }
    }
}

fn curve_edit(
    state: &mut AppState,
    target: ParamAddress,
    edit: impl FnOnce(&mut AutomationCurve, i32) -> Result<(), EditError>,
) -> Result<DispatchResult, EditError> {
    let ((), recorded) = edit_curve(
        state,
        ActionType::AutomationEdit,
        ActionAddition::Allowed,
        target,
        false,
        edit,
    )?;
    Ok(DispatchResult::changed(recorded))
}

pub(super) fn dispatch_automation(
    edit: &AutomationEdit,
    state: &mut AppState,
) -> Result<DispatchResult, EditError> {
    match edit {
        AutomationEdit::AddParam { target, value } => {
            let set = state
                .song
                .param_set_mut(target.collection)
                .ok_or(EditError::MissingParam(target.param))?;
            set.add(target.param, *value);
            Ok(DispatchResult::changed(false))
        }
        AutomationEdit::RemoveParam(target) => {
            state.remove_param(*target)?;
            Ok(DispatchResult::changed(false))
        }
        AutomationEdit::SetRegion {
            target,
            pos,
            length,
            value,
        } => curve_edit(state, *target, |curve, loop_length| {
            curve.set_value_for_region(*pos, *length, *value, loop_length)
        }),
        AutomationEdit::SetNode {
            target,
            pos,
            value,
            interpolated,
        } => curve_edit(state, *target, |curve, loop_length| {
            if *pos < 0 || *pos >= loop_length {
                return Err(EditError::InvalidRegion {
                    pos: *pos,
                    length: 1,
                    loop_length,
                });
            }
            curve.set_node_at_pos(*pos, *value, *interpolated)?;
            Ok(())
        }),
        AutomationEdit::DeleteRegion {
            target,
            pos,
            length,
        } => curve_edit(state, *target, |curve, loop_length| {
            curve.delete_nodes_within_region(*pos, *length, loop_length)
        }),
        AutomationEdit::Clear(target) => {
            let ((), recorded) = edit_curve(
                state,
                ActionType::AutomationEdit,
                ActionAddition::NotAllowed,
                *target,
                true,
                |curve, _| {
                    curve.delete_automation();
                    Ok(())
                },
            )?;
            Ok(DispatchResult::changed(recorded))
        }
        AutomationEdit::KnobTurn {
            target,
            value,
            record,
        } => knob_turn(state, *target, *value, *record),
        AutomationEdit::ShiftValues { target, offset } => curve_edit(state, *target, |curve, _| {
            curve.shift_values(*offset);
            Ok(())
        }),
        AutomationEdit::ShiftHorizontally { target, amount } => {
            curve_edit(state, *target, |curve, loop_length| {
                curve.shift_horizontally(*amount, loop_length);
                Ok(())
            })
        }
        AutomationEdit::MoveRegion {
            target,
            from,
            length,
            to,
        } => curve_edit(state, *target, |curve, loop_length| {
            let mut stolen = StolenNodes::new();
            curve.steal_nodes(*from, *length, loop_length, &mut stolen)?;
            curve.insert_stolen_nodes(*to, *length, loop_length, &mut stolen)
        }),
        AutomationEdit::DeleteTime {
            target,
            start,
            length,
        } => curve_edit(state, *target, |curve, loop_length| {
            curve.delete_time(*start, *length, loop_length)
        }),
        AutomationEdit::InsertTime {
            target,
            pos,
            length,
        } => curve_edit(state, *target, |curve, _| {
            curve.insert_time(*pos, *length);
            Ok(())
        }),
        AutomationEdit::Copy { target, start, end } => {
            let loop_length = loop_length_of(state, target)?;
            let curve = state
                .song
                .curve(target)
                .ok_or(EditError::MissingParam(target.param))?;
            let copied = curve.copy(*start, *end, 1.0, is_patch_cable(target), loop_length)?;
            log::debug!(target: "dispatch", "copied {} nodes from {}", copied.nodes.len(), target);
            state.clipboard = Some(copied);
            Ok(DispatchResult::none())
        }
        AutomationEdit::Paste {
            target,
            start,
            end,
            scale_factor,
        } => {
            let Some(copied) = state.clipboard.take() else {
                log::debug!(target: "dispatch", "paste with empty clipboard");
                return Ok(DispatchResult::none());
            };
            let patch_cable = is_patch_cable(target);
            let result = edit_curve(
                state,
                ActionType::Paste,
                ActionAddition::NotAllowed,
                *target,
                false,
                |curve, loop_length| {
                    curve.paste(*start, *end, *scale_factor, &copied, patch_cable, loop_length)
                },
            );
            state.clipboard = Some(copied);
            let ((), recorded) = result?;
            Ok(DispatchResult::changed(recorded))
        }
    }
}

fn knob_turn(
    state: &mut AppState,
    target: ParamAddress,
    value: i32,
    record: bool,
) -> Result<DispatchResult, EditError> {
    let hold_samples = state.config.override_hold_samples();
    let curve = state
        .song
        .curve(&target)
        .ok_or(EditError::MissingParam(target.param))?;
    let automated = curve.is_automated();
    let play_pos = curve.play_pos();

    if !automated {
        let ((), recorded) = edit_curve(
            state,
            ActionType::ParamUnautomatedValueChange,
            ActionAddition::Allowed,
            target,
            false,
            |curve, _| {
                curve.set_current_value_from_user(value, hold_samples, false);
                Ok(())
            },
        )?;
        return Ok(DispatchResult::changed(recorded));
    }

    match play_pos {
        Some(play_pos) if record => {
            let ((), recorded) = edit_curve(
                state,
                ActionType::Record,
                ActionAddition::Allowed,
                target,
                false,
                |curve, _| {
                    curve.set_node_at_pos(play_pos, value, false)?;
                    curve.set_current_value_from_user(value, hold_samples, true);
                    Ok(())
                },
            )?;
            Ok(DispatchResult::changed(recorded))
        }
        _ => {
            // Transient override of playing automation, not undoable
            if let Some(curve) = state.song.curve_mut(&target) {
                curve.set_current_value_from_user(value, hold_samples, false);
            }
            Ok(DispatchResult::changed(false))
        }
    }
}
