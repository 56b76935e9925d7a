//! Per-parameter automation curves.
//!
//! A curve is an ordered list of [`Node`]s over one loop plus a resolved
//! `current_value`. With no nodes the parameter is unautomated and
//! `current_value` is its value everywhere. A node's `interpolated` flag
//! ramps linearly from that node to the next one; otherwise the value holds
//! until the next node. The segment after the last node wraps around to the
//! first.
//!
//! Curves never talk to the undo log. Callers snapshot through
//! [`crate::action_log::ActionLog`] before mutating.

mod clipboard;
mod playback;
mod steal;


pub use clipboard::CopiedAutomation;
pub use playback::OverrideState;
pub use steal::StolenNodes;

use trellis_types::{Node, Pos, PositionIndexedSequence, SequenceError};

use crate::error::EditError;
use playback::PlaybackCursor;

/// What an undo snapshot of a curve holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurveState {
    pub nodes: PositionIndexedSequence<Node>,
    pub value: i32,
}

impl CurveState {
    pub fn try_clone(&self) -> Result<Self, SequenceError> {
        Ok(Self {
            nodes: self.nodes.try_clone()?,
            value: self.value,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutomationCurve {
    nodes: PositionIndexedSequence<Node>,
    current_value: i32,
    cursor: Option<PlaybackCursor>,
    override_state: OverrideState,
}

/// Linear interpolation in 64-bit so the full `i32` value range can't overflow.
pub(crate) fn interpolate(from: i32, to: i32, num: i64, den: i64) -> i32 {
    if den == 0 {
        return from;
    }
    let distance = i64::from(to) - i64::from(from);
    (i64::from(from) + distance * num / den) as i32
}

fn check_region(pos: Pos, length: i32, loop_length: i32) -> Result<(), EditError> {
    if loop_length <= 0 || length <= 0 || pos < 0 {
        return Err(EditError::InvalidRegion {
            pos,
            length,
            loop_length,
        });
    }
    Ok(())
}

impl AutomationCurve {
    pub fn new(value: i32) -> Self {
        Self {
            current_value: value,
            ..Self::default()
        }
    }

    /// Build an automated curve from loaded nodes. Positions must be
    /// strictly increasing.
    pub fn from_nodes(nodes: PositionIndexedSequence<Node>, value: i32) -> Result<Self, SequenceError> {
        nodes.check_sequentiality(true)?;
        Ok(Self {
            nodes,
            current_value: value,
            ..Self::default()
        })
    }

    pub fn nodes(&self) -> &PositionIndexedSequence<Node> {
        &self.nodes
    }

    pub fn current_value(&self) -> i32 {
        self.current_value
    }

    pub fn is_automated(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Whether the curve carries anything besides `neutral_value`.
    pub fn contains_something(&self, neutral_value: i32) -> bool {
        self.is_automated() || self.current_value != neutral_value
    }

    fn prev_index(&self, i: usize) -> usize {
        if i == 0 {
            self.nodes.len() - 1
        } else {
            i - 1
        }
    }

    /// Value at `pos`. Playing reversed, a flat step exactly at `pos` is read
    /// from the left side.
    pub fn value_at_pos(&self, pos: Pos, loop_length: i32, reversed: bool) -> i32 {
        let n = self.nodes.len();
        if n == 0 {
            return self.current_value;
        }

        let mut right_i = self.nodes.search_geq(pos + i32::from(!reversed));
        if right_i >= n {
            right_i = 0;
        }
        let left = self.nodes[self.prev_index(right_i)];
        let right = self.nodes[right_i];

        if !left.interpolated {
            return left.value;
        }

        let mut ticks_since_left = pos - left.pos;
        if ticks_since_left == 0 {
            return left.value;
        }
        if ticks_since_left < 0 {
            ticks_since_left += loop_length;
        }

        let mut ticks_between = right.pos - left.pos;
        if ticks_between <= 0 {
            ticks_between += loop_length;
        }

        interpolate(
            left.value,
            right.value,
            i64::from(ticks_since_left),
            i64::from(ticks_between),
        )
    }

    /// Whether the segment containing `pos` ramps.
    fn segment_interpolated_at(&self, pos: Pos) -> bool {
        let n = self.nodes.len();
        if n == 0 {
            return false;
        }
        let mut right_i = self.nodes.search_geq(pos + 1);
        if right_i >= n {
            right_i = 0;
        }
        self.nodes[self.prev_index(right_i)].interpolated
    }

    /// Ticks from `pos` to the next node in the direction of travel,
    /// ignoring a node exactly at `pos`. `loop_length` if unautomated.
    pub fn distance_to_next_node(&self, pos: Pos, loop_length: i32, reversed: bool) -> i32 {
        let n = self.nodes.len();
        if n == 0 {
            return loop_length;
        }
        let found = self.nodes.search_geq(pos + i32::from(!reversed));
        let i = if reversed {
            found.checked_sub(1).unwrap_or(n - 1)
        } else if found == n {
            0
        } else {
            found
        };

        let mut distance = self.nodes[i].pos - pos;
        if reversed {
            distance = -distance;
        }
        if distance <= 0 {
            distance += loop_length;
        }
        distance
    }

    /// Create or overwrite the node at `pos`. Returns its index.
    pub fn set_node_at_pos(
        &mut self,
        pos: Pos,
        value: i32,
        interpolated: bool,
    ) -> Result<usize, EditError> {
        let i = match self.nodes.search_exact(pos) {
            Some(i) => i,
            None => self.nodes.insert(Node::new(pos, value))?,
        };
        if let Some(node) = self.nodes.get_mut(i) {
            node.value = value;
            node.interpolated = interpolated;
        }
        self.resync_cursor();
        Ok(i)
    }

    /// Delete nodes in `pos..pos + length`, wrapping at `loop_length`.
    fn remove_region(&mut self, pos: Pos, length: i32, loop_length: i32) {
        if length >= loop_length {
            self.nodes.clear();
            return;
        }
        let end = pos + length;
        if end >= loop_length {
            let (after_wrap_end, before_wrap_start) = self.nodes.search_dual(end - loop_length, pos);
            let len = self.nodes.len();
            self.nodes.delete_at_index(before_wrap_start, len - before_wrap_start);
            self.nodes.delete_at_index(0, after_wrap_end);
        } else {
            let (start_i, end_i) = self.nodes.search_dual(pos, end);
            self.nodes.delete_at_index(start_i, end_i - start_i);
        }
    }

    /// Drop the node at `pos` if it repeats what its left neighbour already holds.
    fn prune_redundant_at(&mut self, pos: Pos) {
        if self.nodes.len() < 2 {
            return;
        }
        let Some(i) = self.nodes.search_exact(pos) else {
            return;
        };
        let node = self.nodes[i];
        let left = self.nodes[self.prev_index(i)];
        if !left.interpolated && !node.interpolated && left.value == node.value {
            self.nodes.delete_at_index(i, 1);
        }
    }

    /// A lone node is a constant, so fold it back into `current_value`.
    fn collapse_if_single(&mut self) {
        if self.nodes.len() == 1 {
            self.current_value = self.nodes[0].value;
            self.nodes.clear();
        }
    }

    /// Make every position in `pos..pos + length` read `value`, wrapping at
    /// `loop_length`. Flat stretches outside the region keep their values. A
    /// ramp cut by the region is re-anchored on a node at the cut, which
    /// can move the ramp's integer steps by one.
    pub fn set_value_for_region(
        &mut self,
        pos: Pos,
        length: i32,
        value: i32,
        loop_length: i32,
    ) -> Result<(), EditError> {
        check_region(pos, length, loop_length)?;
        if pos >= loop_length {
            log::debug!(target: "automation", "region at {} is beyond loop length {}", pos, loop_length);
            return Ok(());
        }

        if length >= loop_length {
            self.nodes.clear();
            self.current_value = value;
            self.resync_cursor();
            return Ok(());
        }

        let end = pos + length;
        let end_pos = if end >= loop_length {
            end - loop_length
        } else {
            end
        };

        // The boundary after the region keeps whatever was playing there
        let end_value = self.value_at_pos(end_pos, loop_length, false);
        let end_interpolated = self.segment_interpolated_at(end_pos);

        // A ramp running into the region would retarget onto the new value
        let before_pos = if pos == 0 { loop_length - 1 } else { pos - 1 };
        let pin_before = self.segment_interpolated_at(before_pos);
        let before_value = self.value_at_pos(before_pos, loop_length, false);

        self.nodes.try_reserve(3)?;
        self.remove_region(pos, length, loop_length);
        if pin_before {
            match self.nodes.search_exact(before_pos) {
                Some(i) => {
                    if let Some(node) = self.nodes.get_mut(i) {
                        node.interpolated = false;
                    }
                }
                None => {
                    self.nodes.insert(Node::new(before_pos, before_value))?;
                }
            }
        }
        self.nodes.insert(Node::new(pos, value))?;
        if self.nodes.search_exact(end_pos).is_none() {
            self.nodes.insert(Node {
                pos: end_pos,
                value: end_value,
                interpolated: end_interpolated,
            })?;
        }

        self.prune_redundant_at(end_pos);
        self.prune_redundant_at(pos);
        self.collapse_if_single();

        if self.cursor.is_some() {
            self.resync_cursor();
        } else {
            self.current_value = value;
        }
        Ok(())
    }

    /// Remove nodes inside a region and let the value before it carry on.
    pub fn delete_nodes_within_region(
        &mut self,
        pos: Pos,
        length: i32,
        loop_length: i32,
    ) -> Result<(), EditError> {
        check_region(pos, length, loop_length)?;
        if !self.is_automated() {
            return Ok(());
        }
        self.remove_region(pos, length, loop_length);
        self.resync_cursor();
        Ok(())
    }

    /// Forget all nodes. `current_value` is kept.
    pub fn delete_automation(&mut self) {
        self.nodes.clear();
        self.override_state = OverrideState::Off;
        self.resync_cursor();
    }

    /// Add `offset` to every value, saturating at the `i32` range.
    pub fn shift_values(&mut self, offset: i32) {
        self.current_value = self.current_value.saturating_add(offset);
        for node in self.nodes.iter_mut() {
            node.value = node.value.saturating_add(offset);
        }
        self.resync_cursor();
    }

    pub fn shift_horizontally(&mut self, amount: i32, loop_length: i32) {
        self.nodes.shift_horizontal(amount, loop_length);
        self.resync_cursor();
    }

    /// Repeat the first `old_length` ticks of automation up to `new_length`.
    pub fn generate_repeats(&mut self, old_length: i32, new_length: i32) -> Result<(), EditError> {
        if !self.is_automated() {
            return Ok(());
        }
        self.nodes.generate_repeats(old_length, new_length)?;
        self.resync_cursor();
        Ok(())
    }

    /// Cut automation down to `new_length`, keeping the value at position 0.
    pub fn trim_to_length(&mut self, new_length: i32, old_length: i32) -> Result<(), EditError> {
        let Some(last) = self.nodes.last() else {
            return Ok(());
        };
        if last.pos < new_length {
            return Ok(());
        }

        let first_pos = self.nodes[0].pos;
        let value_at_zero = self.value_at_pos(0, old_length, false);

        self.nodes.try_reserve(1)?;
        self.nodes.truncate_from_key(new_length);
        if self.nodes.is_empty() {
            self.current_value = value_at_zero;
        } else if first_pos != 0 {
            self.nodes.insert_at_index(0, Node::new(0, value_at_zero))?;
        }
        self.collapse_if_single();
        self.resync_cursor();
        Ok(())
    }

    /// Remove `length` ticks starting at `start`, pulling later nodes left.
    pub fn delete_time(&mut self, start: Pos, length: i32, loop_length: i32) -> Result<(), EditError> {
        check_region(start, length, loop_length)?;
        let end = start + length;
        let (mut start_i, end_i) = self.nodes.search_dual(start, end);
        let mut num_to_delete = end_i - start_i;

        if num_to_delete > 0 {
            self.nodes.try_reserve(1)?;
            let mut node_at_zero = None;

            if end_i >= self.nodes.len() {
                // Chopping off the tail: keep whatever played at 0
                if self.nodes[0].pos != 0 {
                    node_at_zero = Some(self.value_at_pos(0, loop_length, false));
                }
            } else if self.nodes[end_i].pos > end {
                // Reuse the first doomed node as the cut-point node
                let value_at_end = self.value_at_pos(end, loop_length, false);
                if let Some(cut) = self.nodes.get_mut(start_i) {
                    *cut = Node::new(start, value_at_end);
                }
                num_to_delete -= 1;
                start_i += 1;
            }

            self.nodes.delete_at_index(start_i, num_to_delete);

            if let Some(value) = node_at_zero {
                self.nodes.insert_at_index(0, Node::new(0, value))?;
                start_i += 1;
            }
        }

        for node in self.nodes.iter_mut().skip(start_i) {
            node.pos -= length;
        }

        self.collapse_if_single();
        self.resync_cursor();
        Ok(())
    }

    /// Open a gap of `length` ticks at `pos`, pushing later nodes right.
    pub fn insert_time(&mut self, pos: Pos, length: i32) {
        let start_i = self.nodes.search_geq(pos);
        for node in self.nodes.iter_mut().skip(start_i) {
            node.pos += length;
        }
        self.resync_cursor();
    }

    /// Exchange nodes and value with an undo snapshot. No node is copied.
    pub fn swap_state(&mut self, state: &mut CurveState) {
        self.nodes.swap_with(&mut state.nodes);
        std::mem::swap(&mut self.current_value, &mut state.value);
        self.override_state = OverrideState::Off;
        self.resync_cursor();
    }

    /// Copy of the current nodes and value.
    pub fn snapshot(&self) -> Result<CurveState, SequenceError> {
        Ok(CurveState {
            nodes: self.nodes.try_clone()?,
            value: self.current_value,
        })
    }

    /// Move the nodes out into a snapshot, leaving the curve unautomated at
    /// its current value.
    pub fn take_state(&mut self) -> CurveState {
        let state = CurveState {
            nodes: self.nodes.take(),
            value: self.current_value,
        };
        self.resync_cursor();
        state
    }
}
