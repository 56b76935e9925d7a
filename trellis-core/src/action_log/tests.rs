use super::*;
use crate::state::{ParamAddress, Song};
use trellis_types::{ClipId, Note, NoteRowId, ParamId, ViewState};

const LOOP: i32 = 96;
const CUTOFF: ParamId = ParamId::new(1);

fn song_with_param(value: i32) -> (Song, ParamAddress) {
    crate::init_test_logging();
    let mut song = Song::new();
    song.params.add(CUTOFF, value);
    (song, ParamAddress::song(CUTOFF))
}

fn song_with_rows() -> (Song, ClipId, NoteRowId, NoteRowId) {
    crate::init_test_logging();
    let mut song = Song::new();
    let clip = song.add_clip(LOOP);
    let clip_ref = song.clip_mut(clip).unwrap();
    let row_a = clip_ref.add_note_row();
    let row_b = clip_ref.add_note_row();
    (song, clip, row_a, row_b)
}

fn note_positions(song: &Song, clip: ClipId, row: NoteRowId) -> Vec<i32> {
    song.note_row(clip, row)
        .unwrap()
        .notes()
        .iter()
        .map(|n| n.pos)
        .collect()
}

/// Set a song parameter's value everywhere, recording it into the
/// current automation-edit Action.
fn edit_param(log: &mut ActionLog, song: &mut Song, address: ParamAddress, value: i32) {
    let view = song.view;
    let action = log
        .get_new_action(ActionType::AutomationEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    let curve = song.curve_mut(&address).unwrap();
    action
        .record_param_change_if_not_already_snapshotted(address, curve, false)
        .unwrap();
    curve.set_value_for_region(0, LOOP, value, LOOP).unwrap();
}

/// Add a note to a row, snapshotting the row first.
fn add_note(log: &mut ActionLog, song: &mut Song, clip: ClipId, row: NoteRowId, pos: i32, definite: bool) {
    let view = song.view;
    let action = log
        .get_new_action(ActionType::NoteNudge, ActionAddition::Allowed, 0, &view)
        .unwrap();
    let notes = song.note_row_mut(clip, row).unwrap().notes_mut();
    if definite {
        action
            .record_note_array_change_definitely(clip, row, notes, false)
            .unwrap();
    } else {
        action
            .record_note_array_change_if_not_already_snapshotted(clip, row, notes, false, false)
            .unwrap();
    }
    notes.insert(Note::new(pos, 4, 64)).unwrap();
}

// ---------------------------------------------------------------------------
// Snapshot and revert
// ---------------------------------------------------------------------------

#[test]
fn undo_restores_oldest_snapshot_and_redo_the_newest() {
    let (mut song, address) = song_with_param(5);
    let mut log = ActionLog::new(0);

    edit_param(&mut log, &mut song, address, 7);
    edit_param(&mut log, &mut song, address, 9);
    assert_eq!(log.actions_allocated(), 1);
    assert_eq!(log.head().unwrap().len(), 1);

    assert!(log.revert(Direction::Before, &mut song));
    assert_eq!(song.curve(&address).unwrap().current_value(), 5);
    assert!(log.can_redo());

    assert!(log.revert(Direction::After, &mut song));
    assert_eq!(song.curve(&address).unwrap().current_value(), 9);
    assert!(log.can_undo());
    assert!(!log.can_redo());
}

#[test]
fn undo_restores_node_sequence() {
    let (mut song, address) = song_with_param(0);
    let mut log = ActionLog::new(0);
    let view = song.view;

    let action = log
        .get_new_action(ActionType::AutomationEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    let curve = song.curve_mut(&address).unwrap();
    action
        .record_param_change_if_not_already_snapshotted(address, curve, false)
        .unwrap();
    curve.set_value_for_region(10, 10, 50, LOOP).unwrap();
    assert!(curve.is_automated());

    log.undo(&mut song);
    let curve = song.curve(&address).unwrap();
    assert!(!curve.is_automated());
    assert_eq!(curve.current_value(), 0);

    log.redo(&mut song);
    let curve = song.curve(&address).unwrap();
    assert_eq!(curve.value_at_pos(15, LOOP, false), 50);
    assert_eq!(curve.value_at_pos(25, LOOP, false), 0);
}

#[test]
fn stealing_snapshot_moves_nodes_out() {
    let (mut song, address) = song_with_param(0);
    song.curve_mut(&address)
        .unwrap()
        .set_value_for_region(10, 10, 50, LOOP)
        .unwrap();
    let mut log = ActionLog::new(0);
    let view = song.view;

    let action = log
        .get_new_action(ActionType::AutomationEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    let curve = song.curve_mut(&address).unwrap();
    assert!(action
        .record_param_change_if_not_already_snapshotted(address, curve, true)
        .unwrap());
    assert!(!curve.is_automated());

    log.undo(&mut song);
    assert_eq!(song.curve(&address).unwrap().nodes().len(), 2);
}

#[test]
fn revert_with_nothing_logged() {
    let (mut song, _) = song_with_param(0);
    let mut log = ActionLog::new(0);
    assert!(!log.undo(&mut song));
    assert!(!log.redo(&mut song));
}

#[test]
fn repeated_definite_records_replay_in_order() {
    let (mut song, clip, row, _) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row, 0, true);
    add_note(&mut log, &mut song, clip, row, 10, true);
    assert_eq!(log.head().unwrap().len(), 2);

    log.undo(&mut song);
    assert!(note_positions(&song, clip, row).is_empty());
    log.redo(&mut song);
    assert_eq!(note_positions(&song, clip, row), vec![0, 10]);
    log.undo(&mut song);
    assert!(note_positions(&song, clip, row).is_empty());
}

#[test]
fn view_restored_per_direction() {
    let (mut song, address) = song_with_param(0);
    let mut log = ActionLog::new(0);
    let before = song.view;

    edit_param(&mut log, &mut song, address, 1);
    song.view.x_scroll_clip = 48;
    song.view.triplets_on = true;
    let after = song.view;
    edit_param(&mut log, &mut song, address, 2);

    log.undo(&mut song);
    assert_eq!(song.view, before);
    log.redo(&mut song);
    assert_eq!(song.view, after);
}

// ---------------------------------------------------------------------------
// Coalescing
// ---------------------------------------------------------------------------

#[test]
fn matching_allowed_actions_coalesce() {
    let mut log = ActionLog::new(0);
    let view = ViewState::default();

    log.get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    log.get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, 5, &view)
        .unwrap();
    assert_eq!(log.actions_allocated(), 1);
    assert_eq!(log.len(Direction::Before), 1);

    log.get_new_action(ActionType::NoteEdit, ActionAddition::NotAllowed, 5, &view)
        .unwrap();
    assert_eq!(log.actions_allocated(), 2);

    log.get_new_action(ActionType::AutomationEdit, ActionAddition::Allowed, 5, &view)
        .unwrap();
    assert_eq!(log.actions_allocated(), 3);
    assert_eq!(log.len(Direction::Before), 3);
}

#[test]
fn created_just_now_only_coalesces_same_sample_time() {
    let mut log = ActionLog::new(0);
    let view = ViewState::default();

    log.get_new_action(ActionType::Paste, ActionAddition::AllowedIfCreatedJustNow, 100, &view)
        .unwrap();
    log.get_new_action(ActionType::Paste, ActionAddition::AllowedIfCreatedJustNow, 100, &view)
        .unwrap();
    assert_eq!(log.actions_allocated(), 1);

    log.get_new_action(ActionType::Paste, ActionAddition::AllowedIfCreatedJustNow, 101, &view)
        .unwrap();
    assert_eq!(log.actions_allocated(), 2);
}

#[test]
fn closed_action_takes_no_more_edits() {
    let mut log = ActionLog::new(0);
    let view = ViewState::default();

    log.get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    log.close_action(ActionType::AutomationEdit);
    assert!(log.head().unwrap().is_open());

    log.close_action(ActionType::NoteEdit);
    assert_eq!(log.head().unwrap().state(), ActionState::Closed);

    log.get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    assert_eq!(log.actions_allocated(), 2);
}

#[test]
fn close_unless_created_just_now() {
    let mut log = ActionLog::new(0);
    let view = ViewState::default();

    log.get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, 7, &view)
        .unwrap();
    log.close_action_unless_created_just_now(ActionType::NoteEdit, 7);
    assert!(log.head().unwrap().is_open());

    log.close_action_unless_created_just_now(ActionType::NoteEdit, 8);
    assert!(!log.head().unwrap().is_open());
}

#[test]
fn new_edit_discards_redo() {
    let (mut song, address) = song_with_param(0);
    let mut log = ActionLog::new(0);

    edit_param(&mut log, &mut song, address, 1);
    log.undo(&mut song);
    assert!(log.can_redo());
    assert_eq!(
        log.newest(Direction::After).unwrap().state(),
        ActionState::Reverted
    );

    edit_param(&mut log, &mut song, address, 2);
    assert!(!log.can_redo());
}

#[test]
fn history_depth_is_capped() {
    let mut log = ActionLog::new(2);
    let view = ViewState::default();
    for _ in 0..3 {
        log.get_new_action(ActionType::Misc, ActionAddition::NotAllowed, 0, &view)
            .unwrap();
    }
    assert_eq!(log.len(Direction::Before), 2);
    assert_eq!(log.actions_allocated(), 3);
}

#[test]
fn empty_record_action_is_discarded() {
    let (mut song, _) = song_with_param(0);
    let mut log = ActionLog::new(0);
    let view = ViewState::default();

    log.get_new_action(ActionType::Record, ActionAddition::Allowed, 0, &view)
        .unwrap();
    log.get_new_action(ActionType::NoteEdit, ActionAddition::Allowed, 0, &view)
        .unwrap();
    assert_eq!(log.len(Direction::Before), 1);
    assert_eq!(log.head().unwrap().action_type(), ActionType::NoteEdit);

    log.delete_all_logs();
    log.get_new_action(ActionType::Record, ActionAddition::Allowed, 0, &view)
        .unwrap();
    assert!(!log.undo(&mut song));
    assert!(!log.can_undo());
}

// ---------------------------------------------------------------------------
// Partial undo
// ---------------------------------------------------------------------------

#[test]
fn partial_undo_reverts_front_run_of_one_row() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_b, 0, true);
    add_note(&mut log, &mut song, clip, row_a, 0, true);
    add_note(&mut log, &mut song, clip, row_a, 10, true);
    let rows: Vec<_> = log
        .head()
        .unwrap()
        .consequences()
        .map(|c| c.note_row().unwrap().1)
        .collect();
    assert_eq!(rows, vec![row_a, row_a, row_b]);

    assert!(!log.undo_just_one_consequence_per_note_row(&mut song));
    assert!(note_positions(&song, clip, row_a).is_empty());
    assert_eq!(note_positions(&song, clip, row_b), vec![0]);
    let head = log.head().unwrap();
    assert!(head.is_open());
    assert_eq!(head.len(), 1);

    // One consequence per row now, so the rest goes too
    assert!(log.undo_just_one_consequence_per_note_row(&mut song));
    assert!(note_positions(&song, clip, row_b).is_empty());
    assert!(!log.can_undo());
    assert!(!log.can_redo());
}

#[test]
fn partial_undo_of_only_run_removes_the_action() {
    let (mut song, clip, row_a, _) = song_with_rows();
    let mut log = ActionLog::new(0);
    let view = song.view;

    log.record_swing_change(0, 5, 0, &view).unwrap();
    song.swing = 5;
    log.close_action(ActionType::SwingChange);

    add_note(&mut log, &mut song, clip, row_a, 0, true);
    add_note(&mut log, &mut song, clip, row_a, 10, true);

    assert!(log.undo_just_one_consequence_per_note_row(&mut song));
    assert!(note_positions(&song, clip, row_a).is_empty());
    assert_eq!(log.len(Direction::Before), 1);

    // The next undo reaches the swing change rather than an empty step
    assert!(log.undo(&mut song));
    assert_eq!(song.swing, 0);
}

#[test]
fn partial_undo_steps_front_row_while_another_row_repeats() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_b, 0, true);
    add_note(&mut log, &mut song, clip, row_b, 10, true);
    add_note(&mut log, &mut song, clip, row_a, 0, true);

    assert!(!log.undo_just_one_consequence_per_note_row(&mut song));
    assert!(note_positions(&song, clip, row_a).is_empty());
    assert_eq!(note_positions(&song, clip, row_b), vec![0, 10]);
    assert_eq!(log.head().unwrap().len(), 2);
}

#[test]
fn partial_undo_of_one_edit_per_row_takes_whole_action() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_a, 0, false);
    add_note(&mut log, &mut song, clip, row_b, 5, false);

    assert!(log.undo_just_one_consequence_per_note_row(&mut song));
    assert!(note_positions(&song, clip, row_a).is_empty());
    assert!(note_positions(&song, clip, row_b).is_empty());
    assert!(!log.can_redo());
}

#[test]
fn partial_undo_needs_open_action() {
    let (mut song, clip, row_a, _) = song_with_rows();
    let mut log = ActionLog::new(0);
    assert!(!log.undo_just_one_consequence_per_note_row(&mut song));

    add_note(&mut log, &mut song, clip, row_a, 0, true);
    log.close_action(ActionType::NoteNudge);
    assert!(!log.undo_just_one_consequence_per_note_row(&mut song));
    assert_eq!(note_positions(&song, clip, row_a), vec![0]);
}

#[test]
fn already_snapshotted_row_moves_to_front() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);
    let view = song.view;

    add_note(&mut log, &mut song, clip, row_a, 0, false);
    add_note(&mut log, &mut song, clip, row_b, 0, false);

    let action = log
        .get_new_action(ActionType::NoteNudge, ActionAddition::Allowed, 0, &view)
        .unwrap();
    let notes = song.note_row_mut(clip, row_a).unwrap().notes_mut();
    let recorded = action
        .record_note_array_change_if_not_already_snapshotted(clip, row_a, notes, false, true)
        .unwrap();
    assert!(!recorded);
    assert_eq!(action.len(), 2);
    assert_eq!(
        action.consequences().next().unwrap().note_row(),
        Some((clip, row_a))
    );
}

// ---------------------------------------------------------------------------
// Scalar consequences
// ---------------------------------------------------------------------------

#[test]
fn swing_changes_coalesce_into_one_consequence() {
    let (mut song, _) = song_with_param(0);
    let mut log = ActionLog::new(0);
    let view = song.view;

    log.record_swing_change(0, 10, 0, &view).unwrap();
    log.record_swing_change(10, 20, 0, &view).unwrap();
    song.swing = 20;
    assert_eq!(log.actions_allocated(), 1);
    assert_eq!(log.head().unwrap().len(), 1);

    log.undo(&mut song);
    assert_eq!(song.swing, 0);
    log.redo(&mut song);
    assert_eq!(song.swing, 20);
}

#[test]
fn tempo_change_reverts() {
    let (mut song, _) = song_with_param(0);
    let mut log = ActionLog::new(0);
    let view = song.view;

    log.record_tempo_change(1000, 800, 0, &view).unwrap();
    song.time_per_big = 800;
    log.undo(&mut song);
    assert_eq!(song.time_per_big, 1000);
    log.redo(&mut song);
    assert_eq!(song.time_per_big, 800);
}

#[test]
fn clip_length_change_reverts() {
    let (mut song, clip, _, _) = song_with_rows();
    let mut log = ActionLog::new(0);
    let view = song.view;

    let action = log
        .get_new_action(ActionType::ClipLength, ActionAddition::NotAllowed, 0, &view)
        .unwrap();
    action.record_clip_length_change(clip, LOOP).unwrap();
    song.clip_mut(clip).unwrap().set_loop_length(LOOP * 2).unwrap();

    log.undo(&mut song);
    assert_eq!(song.clip(clip).unwrap().loop_length(), LOOP);
    log.redo(&mut song);
    assert_eq!(song.clip(clip).unwrap().loop_length(), LOOP * 2);
}

// ---------------------------------------------------------------------------
// Destroyed targets
// ---------------------------------------------------------------------------

#[test]
fn missing_target_revert_is_noop() {
    let (mut song, clip, row_a, _) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_a, 0, false);
    song.remove_clip(clip);

    assert!(log.undo(&mut song));
    assert!(log.redo(&mut song));
}

#[test]
fn destroyed_clip_drops_its_consequences() {
    let (mut song, clip, row_a, _) = song_with_rows();
    song.clip_mut(clip).unwrap().params.add(CUTOFF, 0);
    let address = ParamAddress::clip(clip, CUTOFF);
    let song_param = ParamAddress::song(CUTOFF);
    song.params.add(CUTOFF, 0);
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_a, 0, false);
    let view = song.view;
    let action = log
        .get_new_action(ActionType::NoteNudge, ActionAddition::Allowed, 0, &view)
        .unwrap();
    action
        .record_param_change_if_not_already_snapshotted(address, song.curve_mut(&address).unwrap(), false)
        .unwrap();
    action
        .record_param_change_if_not_already_snapshotted(
            song_param,
            song.curve_mut(&song_param).unwrap(),
            false,
        )
        .unwrap();
    assert_eq!(log.head().unwrap().len(), 3);

    assert_eq!(log.notify_target_destroyed(Target::Clip(clip)), 2);
    let head = log.head().unwrap();
    assert_eq!(head.len(), 1);
    assert!(head.contains_param_change(&song_param));
}

#[test]
fn destroyed_row_keeps_other_rows() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_a, 0, false);
    add_note(&mut log, &mut song, clip, row_b, 0, false);
    log.undo(&mut song);

    assert_eq!(log.notify_target_destroyed(Target::NoteRow(clip, row_a)), 1);
    log.redo(&mut song);
    assert_eq!(note_positions(&song, clip, row_b), vec![0]);
    assert!(note_positions(&song, clip, row_a).is_empty());
}

#[test]
fn destroyed_target_removes_emptied_actions() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);

    add_note(&mut log, &mut song, clip, row_b, 0, false);
    log.close_action(ActionType::NoteNudge);
    add_note(&mut log, &mut song, clip, row_a, 0, false);
    log.close_action(ActionType::NoteNudge);
    add_note(&mut log, &mut song, clip, row_a, 10, false);
    log.undo(&mut song);
    assert_eq!((log.len(Direction::Before), log.len(Direction::After)), (2, 1));

    assert_eq!(log.notify_target_destroyed(Target::NoteRow(clip, row_a)), 2);
    assert_eq!((log.len(Direction::Before), log.len(Direction::After)), (1, 0));

    // The surviving step still undoes row B's note
    assert!(log.undo(&mut song));
    assert!(note_positions(&song, clip, row_b).is_empty());
}

// ---------------------------------------------------------------------------
// Abandoned edits
// ---------------------------------------------------------------------------

#[test]
fn abandon_keeps_earlier_consequences() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    song.params.add(CUTOFF, 0);
    let song_param = ParamAddress::song(CUTOFF);
    let mut log = ActionLog::new(0);
    add_note(&mut log, &mut song, clip, row_a, 0, false);

    let view = song.view;
    let action = log
        .get_new_action(ActionType::NoteNudge, ActionAddition::Allowed, 0, &view)
        .unwrap();
    let kept = action.len();
    action
        .record_note_array_change_if_not_already_snapshotted(
            clip,
            row_b,
            song.note_row_mut(clip, row_b).unwrap().notes_mut(),
            false,
            false,
        )
        .unwrap();
    action
        .record_param_change_if_not_already_snapshotted(
            song_param,
            song.curve_mut(&song_param).unwrap(),
            false,
        )
        .unwrap();
    assert_eq!(log.head().unwrap().len(), 3);

    log.abandon_recording(kept, false);
    let head = log.head().unwrap();
    assert_eq!(head.len(), 1);
    assert!(head.is_open());
    assert_eq!(head.consequences().next().and_then(|c| c.note_row()), Some((clip, row_a)));
}

#[test]
fn abandon_drops_action_created_for_the_edit() {
    let (mut song, clip, row_a, row_b) = song_with_rows();
    let mut log = ActionLog::new(0);
    add_note(&mut log, &mut song, clip, row_a, 0, false);

    let view = song.view;
    let action = log
        .get_new_action(ActionType::ClipLength, ActionAddition::NotAllowed, 0, &view)
        .unwrap();
    action
        .record_note_array_change_if_not_already_snapshotted(
            clip,
            row_b,
            song.note_row_mut(clip, row_b).unwrap().notes_mut(),
            false,
            false,
        )
        .unwrap();
    action.record_clip_length_change(clip, LOOP).unwrap();
    assert_eq!(log.len(Direction::Before), 2);

    log.abandon_recording(0, true);
    assert_eq!(log.len(Direction::Before), 1);
    assert_eq!(log.head().unwrap().action_type(), ActionType::NoteNudge);
    assert_eq!(log.head().unwrap().len(), 1);
}
