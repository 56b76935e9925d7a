use std::collections::VecDeque;

use trellis_types::{ClipId, NoteRowId, NoteSequence, SampleTime, SequenceError, ViewState};

use super::consequence::{Consequence, Target};
use super::{ActionAddition, ActionType, Direction};
use crate::automation::AutomationCurve;
use crate::error::EditError;
use crate::state::{ParamAddress, Song};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// Newest on the undo stack and still accepting consequences
    Open,
    Closed,
    /// Undone, waiting on the redo stack
    Reverted,
}

/// One undo step.
#[derive(Debug, Clone)]
pub struct Action {
    action_type: ActionType,
    state: ActionState,
    creation_time: SampleTime,
    /// Newest first
    consequences: VecDeque<Consequence>,
    view: [ViewState; 2],
}

impl Action {
    pub(crate) fn new(action_type: ActionType, creation_time: SampleTime, view: ViewState) -> Self {
        Self {
            action_type,
            state: ActionState::Open,
            creation_time,
            consequences: VecDeque::new(),
            view: [view, view],
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ActionState::Open
    }

    pub fn creation_time(&self) -> SampleTime {
        self.creation_time
    }

    pub fn view(&self, direction: Direction) -> &ViewState {
        &self.view[direction.index()]
    }

    pub fn consequences(&self) -> impl Iterator<Item = &Consequence> {
        self.consequences.iter()
    }

    pub fn len(&self) -> usize {
        self.consequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consequences.is_empty()
    }

    pub(crate) fn accepts(&self, action_type: ActionType, addition: ActionAddition, now: SampleTime) -> bool {
        self.is_open()
            && self.action_type == action_type
            && match addition {
                ActionAddition::NotAllowed => false,
                ActionAddition::Allowed => true,
                ActionAddition::AllowedIfCreatedJustNow => self.creation_time == now,
            }
    }

    pub(crate) fn close(&mut self) {
        if self.state == ActionState::Open {
            self.state = ActionState::Closed;
        }
    }

    pub(crate) fn set_view_after(&mut self, view: ViewState) {
        self.view[Direction::After.index()] = view;
    }

    /// Put a consequence at the front of the list.
    pub fn add_consequence(&mut self, consequence: Consequence) -> Result<(), EditError> {
        self.consequences
            .try_reserve(1)
            .map_err(SequenceError::from)?;
        self.consequences.push_front(consequence);
        Ok(())
    }

    pub(crate) fn pop_front_consequence(&mut self) -> Option<Consequence> {
        self.consequences.pop_front()
    }

    /// Drop the newest consequences until `keep` remain.
    pub(crate) fn truncate_newest(&mut self, keep: usize) {
        while self.consequences.len() > keep {
            self.consequences.pop_front();
        }
    }

    pub(crate) fn front_consequence_mut(&mut self) -> Option<&mut Consequence> {
        self.consequences.front_mut()
    }

    pub fn contains_param_change(&self, target: &ParamAddress) -> bool {
        self.consequences.iter().any(|c| c.param() == Some(target))
    }

    fn find_note_array_change(&self, clip: ClipId, row: NoteRowId) -> Option<usize> {
        self.consequences
            .iter()
            .position(|c| c.note_row() == Some((clip, row)))
    }

    /// Snapshot `curve` unless this Action already holds its earlier state.
    /// With `steal` the nodes are moved out instead of copied, leaving the
    /// curve unautomated; the caller is about to replace them anyway.
    /// Returns whether a new snapshot was taken.
    pub fn record_param_change_if_not_already_snapshotted(
        &mut self,
        target: ParamAddress,
        curve: &mut AutomationCurve,
        steal: bool,
    ) -> Result<bool, EditError> {
        if self.contains_param_change(&target) {
            if steal {
                curve.delete_automation();
            }
            return Ok(false);
        }

        self.consequences
            .try_reserve(1)
            .map_err(SequenceError::from)?;
        let snapshot = if steal {
            curve.take_state()
        } else {
            curve.snapshot()?
        };
        log::debug!(target: "action_log", "snapshotted {} ({} nodes)", target, snapshot.nodes.len());
        self.consequences
            .push_front(Consequence::ParamChange { target, snapshot });
        Ok(true)
    }

    /// Snapshot a note row unless already snapshotted. `move_to_front`
    /// brings an existing snapshot of the row to the front so that per-row
    /// runs stay contiguous.
    pub fn record_note_array_change_if_not_already_snapshotted(
        &mut self,
        clip: ClipId,
        row: NoteRowId,
        notes: &mut NoteSequence,
        steal: bool,
        move_to_front: bool,
    ) -> Result<bool, EditError> {
        if let Some(i) = self.find_note_array_change(clip, row) {
            if move_to_front && i != 0 {
                if let Some(existing) = self.consequences.remove(i) {
                    self.consequences.push_front(existing);
                }
            }
            if steal {
                notes.clear();
            }
            return Ok(false);
        }
        self.record_note_array(clip, row, notes, steal, false)?;
        Ok(true)
    }

    /// Snapshot a note row even if an earlier snapshot exists. Each call
    /// becomes its own step for partial undo.
    pub fn record_note_array_change_definitely(
        &mut self,
        clip: ClipId,
        row: NoteRowId,
        notes: &mut NoteSequence,
        steal: bool,
    ) -> Result<(), EditError> {
        self.record_note_array(clip, row, notes, steal, true)
    }

    fn record_note_array(
        &mut self,
        clip: ClipId,
        row: NoteRowId,
        notes: &mut NoteSequence,
        steal: bool,
        definite: bool,
    ) -> Result<(), EditError> {
        self.consequences
            .try_reserve(1)
            .map_err(SequenceError::from)?;
        let snapshot = if steal { notes.take() } else { notes.try_clone()? };
        log::debug!(target: "action_log", "snapshotted clip {} row {} ({} notes)", clip, row, snapshot.len());
        self.consequences.push_front(Consequence::NoteArrayChange {
            clip,
            row,
            notes: snapshot,
            definite,
        });
        Ok(())
    }

    /// Record a clip's loop length before it changes. Note and curve
    /// content is recorded separately.
    pub fn record_clip_length_change(&mut self, clip: ClipId, old_length: i32) -> Result<(), EditError> {
        self.add_consequence(Consequence::ClipLength {
            clip,
            length: old_length,
        })
    }

    /// Revert every consequence, newest first, and restore the view for
    /// `direction`. The list is reversed afterwards so that reverting the
    /// other way walks the same edits in the opposite order.
    pub(crate) fn revert(&mut self, direction: Direction, song: &mut Song) {
        for consequence in self.consequences.iter_mut() {
            consequence.revert(direction, song);
        }
        self.consequences.make_contiguous().reverse();
        song.view = self.view[direction.index()];
        self.state = match direction {
            Direction::Before => ActionState::Reverted,
            Direction::After => ActionState::Closed,
        };
    }

    /// Drop every consequence referring to `target`. Returns how many went.
    pub(crate) fn forget(&mut self, target: &Target) -> usize {
        let before = self.consequences.len();
        self.consequences.retain(|c| !c.refers_to(target));
        before - self.consequences.len()
    }
}
