use std::collections::VecDeque;

use trellis_types::{SampleTime, ViewState};

use super::action::Action;
use super::consequence::{Consequence, Target};
use super::{ActionAddition, ActionType, Direction};
use crate::automation::AutomationCurve;
use crate::error::EditError;
use crate::state::{ParamAddress, Song};

/// The undo and redo stacks. The back of each stack is its newest Action.
#[derive(Debug)]
pub struct ActionLog {
    undo_stack: VecDeque<Action>,
    redo_stack: VecDeque<Action>,
    /// 0 = unlimited
    max_depth: usize,
    actions_allocated: usize,
}

impl ActionLog {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
            actions_allocated: 0,
        }
    }

    fn stack(&self, direction: Direction) -> &VecDeque<Action> {
        match direction {
            Direction::Before => &self.undo_stack,
            Direction::After => &self.redo_stack,
        }
    }

    fn stack_mut(&mut self, direction: Direction) -> &mut VecDeque<Action> {
        match direction {
            Direction::Before => &mut self.undo_stack,
            Direction::After => &mut self.redo_stack,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self, direction: Direction) -> usize {
        self.stack(direction).len()
    }

    /// Total Actions ever created. Coalesced edits don't count.
    pub fn actions_allocated(&self) -> usize {
        self.actions_allocated
    }

    /// Newest Action on the undo stack.
    pub fn head(&self) -> Option<&Action> {
        self.undo_stack.back()
    }

    pub fn newest(&self, direction: Direction) -> Option<&Action> {
        self.stack(direction).back()
    }

    /// The open Action, if any.
    pub fn open_action_mut(&mut self) -> Option<&mut Action> {
        self.undo_stack.back_mut().filter(|action| action.is_open())
    }

    /// Get the Action a new edit should record into, either the open one
    /// (coalescing) or a fresh one. Any redo history is discarded. Returns
    /// `None` if a new Action could not be allocated, in which case the edit
    /// goes ahead without undo.
    pub fn get_new_action(
        &mut self,
        action_type: ActionType,
        addition: ActionAddition,
        now: SampleTime,
        view: &ViewState,
    ) -> Option<&mut Action> {
        self.delete_log(Direction::After);

        let coalesce = self
            .undo_stack
            .back()
            .is_some_and(|head| head.accepts(action_type, addition, now));
        if coalesce {
            log::debug!(target: "action_log", "adding to open {:?} action", action_type);
            let head = self.undo_stack.back_mut()?;
            head.set_view_after(*view);
            return Some(head);
        }

        self.delete_last_action_if_empty();
        if let Some(head) = self.undo_stack.back_mut() {
            head.close();
        }

        if self.undo_stack.try_reserve(1).is_err() {
            log::warn!(target: "action_log", "no memory for a new {:?} action, edit won't be undoable", action_type);
            return None;
        }
        self.undo_stack
            .push_back(Action::new(action_type, now, *view));
        self.actions_allocated += 1;
        log::debug!(target: "action_log", "new {:?} action", action_type);
        self.enforce_depth();
        self.undo_stack.back_mut()
    }

    fn enforce_depth(&mut self) {
        if self.max_depth == 0 {
            return;
        }
        while self.undo_stack.len() > self.max_depth {
            if self.undo_stack.pop_front().is_some() {
                log::debug!(target: "action_log", "dropped oldest action");
            }
        }
    }

    /// Stop the open Action taking more edits if it is of `action_type`.
    pub fn close_action(&mut self, action_type: ActionType) {
        if let Some(head) = self.undo_stack.back_mut() {
            if head.action_type() == action_type {
                head.close();
            }
        }
    }

    /// As [`close_action`](Self::close_action), except an Action created at
    /// `now` stays open.
    pub fn close_action_unless_created_just_now(&mut self, action_type: ActionType, now: SampleTime) {
        if let Some(head) = self.undo_stack.back_mut() {
            if head.action_type() == action_type && head.creation_time() != now {
                head.close();
            }
        }
    }

    /// Drop the newest undo Action if it is an empty recording.
    pub fn delete_last_action_if_empty(&mut self) {
        let empty_record = self
            .undo_stack
            .back()
            .is_some_and(|head| head.action_type() == ActionType::Record && head.is_empty());
        if empty_record {
            self.undo_stack.pop_back();
            log::debug!(target: "action_log", "discarded empty record action");
        }
    }

    /// Move the newest Action of the `direction` stack to the other stack,
    /// reverting its consequences. Returns whether anything was reverted.
    pub fn revert(&mut self, direction: Direction, song: &mut Song) -> bool {
        self.delete_last_action_if_empty();

        let Some(mut action) = self.stack_mut(direction).pop_back() else {
            return false;
        };
        action.revert(direction, song);
        log::debug!(target: "action_log", "reverted {:?} action to {:?} ({} consequences)", action.action_type(), direction, action.len());

        let other = self.stack_mut(direction.other());
        if other.try_reserve(1).is_err() {
            // Reverted but can't be re-applied; drop it and the stale redo chain
            log::warn!(target: "action_log", "no memory to keep reverted action");
            other.clear();
            return true;
        }
        other.push_back(action);
        if direction == Direction::After {
            self.enforce_depth();
        }
        true
    }

    pub fn undo(&mut self, song: &mut Song) -> bool {
        self.revert(Direction::Before, song)
    }

    pub fn redo(&mut self, song: &mut Song) -> bool {
        self.revert(Direction::After, song)
    }

    /// Step back one micro-edit within the open Action.
    ///
    /// If every note row touched has exactly one consequence, the whole
    /// Action is undone. Otherwise only the run at the front sharing the
    /// newest consequence's row is reverted and discarded, and the Action
    /// stays open unless that run was all it held. Redo history is cleared
    /// either way. Returns whether the whole Action was reverted.
    pub fn undo_just_one_consequence_per_note_row(&mut self, song: &mut Song) -> bool {
        let Some(action) = self.open_action_mut() else {
            return false;
        };
        let Some(first_row) = action.consequences().next().and_then(Consequence::note_row) else {
            return false;
        };

        let rows: Vec<_> = action.consequences().filter_map(Consequence::note_row).collect();
        let shared = rows
            .iter()
            .enumerate()
            .any(|(i, row)| rows[i + 1..].contains(row));

        let reverted_whole = if shared {
            let mut reverted = 0;
            while action
                .consequences()
                .next()
                .is_some_and(|c| c.note_row() == Some(first_row))
            {
                if let Some(consequence) = action.front_consequence_mut() {
                    consequence.revert(Direction::Before, song);
                }
                action.pop_front_consequence();
                reverted += 1;
            }
            log::debug!(target: "action_log", "partial undo of {} consequences on row {}", reverted, first_row.1);
            let emptied = action.is_empty();
            if emptied {
                self.undo_stack.pop_back();
            }
            emptied
        } else {
            self.revert(Direction::Before, song);
            log::debug!(target: "action_log", "partial undo took whole action");
            true
        };

        self.delete_log(Direction::After);
        reverted_whole
    }

    /// Roll back the bookkeeping of an edit that failed after recording:
    /// drop the consequences it added on top of the `kept` the head already
    /// held and, if the Action was created for it and is now empty, the
    /// Action too.
    pub(crate) fn abandon_recording(&mut self, kept: usize, created_action: bool) {
        let Some(head) = self.undo_stack.back_mut() else {
            return;
        };
        head.truncate_newest(kept);
        if created_action && head.is_empty() {
            self.undo_stack.pop_back();
            log::debug!(target: "action_log", "abandoned action of failed edit");
        }
    }

    /// Release every Action on one stack.
    pub fn delete_log(&mut self, direction: Direction) {
        let stack = self.stack_mut(direction);
        if !stack.is_empty() {
            log::debug!(target: "action_log", "deleting {} actions from {:?} log", stack.len(), direction);
            stack.clear();
        }
    }

    pub fn delete_all_logs(&mut self) {
        self.delete_log(Direction::Before);
        self.delete_log(Direction::After);
    }

    /// Drop every consequence that refers to a structure about to be
    /// destroyed, and any Action left with nothing to revert. Returns how
    /// many consequences were dropped.
    pub fn notify_target_destroyed(&mut self, target: Target) -> usize {
        let mut dropped = 0;
        for stack in [&mut self.undo_stack, &mut self.redo_stack] {
            stack.retain_mut(|action| {
                let forgotten = action.forget(&target);
                dropped += forgotten;
                forgotten == 0 || !action.is_empty()
            });
        }
        if dropped > 0 {
            log::debug!(target: "action_log", "forgot {} consequences for {:?}", dropped, target);
        }
        dropped
    }

    /// Record a curve's state before a change to its unautomated value.
    pub fn record_unautomated_param_change(
        &mut self,
        action_type: ActionType,
        target: ParamAddress,
        curve: &mut AutomationCurve,
        now: SampleTime,
        view: &ViewState,
    ) -> Result<(), EditError> {
        let Some(action) = self.get_new_action(action_type, ActionAddition::Allowed, now, view) else {
            return Ok(());
        };
        action.record_param_change_if_not_already_snapshotted(target, curve, false)?;
        Ok(())
    }

    /// Record a swing change. Repeated changes coalesce into one
    /// consequence whose "after" half keeps moving.
    pub fn record_swing_change(
        &mut self,
        before: i8,
        after: i8,
        now: SampleTime,
        view: &ViewState,
    ) -> Result<(), EditError> {
        let Some(action) =
            self.get_new_action(ActionType::SwingChange, ActionAddition::Allowed, now, view)
        else {
            return Ok(());
        };
        if let Some(Consequence::SwingChange { swing }) = action.front_consequence_mut() {
            swing[Direction::After.index()] = after;
            return Ok(());
        }
        action.add_consequence(Consequence::SwingChange {
            swing: [before, after],
        })
    }

    pub fn record_tempo_change(
        &mut self,
        before: u64,
        after: u64,
        now: SampleTime,
        view: &ViewState,
    ) -> Result<(), EditError> {
        let Some(action) =
            self.get_new_action(ActionType::TempoChange, ActionAddition::Allowed, now, view)
        else {
            return Ok(());
        };
        if let Some(Consequence::TempoChange { time_per_big }) = action.front_consequence_mut() {
            time_per_big[Direction::After.index()] = after;
            return Ok(());
        }
        action.add_consequence(Consequence::TempoChange {
            time_per_big: [before, after],
        })
    }
}
