use trellis_types::{Node, Pos, SequenceError};

use super::{check_region, AutomationCurve};
use crate::error::EditError;

/// Detached automation for copy/paste. Positions start at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopiedAutomation {
    /// Length of the copied region in ticks
    pub width: i32,
    pub nodes: Vec<Node>,
}

impl CopiedAutomation {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl AutomationCurve {
    /// Copy the nodes in `start..end`, re-based to 0 and scaled by
    /// `scale_factor`. If the region doesn't begin on a node, one carrying
    /// the value at `start` is added at 0. Patch cable depths are stored at
    /// double resolution.
    pub fn copy(
        &self,
        start: Pos,
        end: Pos,
        scale_factor: f32,
        is_patch_cable: bool,
        loop_length: i32,
    ) -> Result<CopiedAutomation, EditError> {
        check_region(start, end - start, loop_length)?;
        let mut copied = CopiedAutomation {
            width: end - start,
            nodes: Vec::new(),
        };

        let (start_i, end_i) = self.nodes.search_dual(start, end);
        if start_i == end_i {
            return Ok(copied);
        }

        let extra_at_start = self.nodes[start_i].pos != start;
        copied
            .nodes
            .try_reserve_exact(end_i - start_i + usize::from(extra_at_start))
            .map_err(SequenceError::from)?;

        let widen = |value: i32| {
            if is_patch_cable {
                value.saturating_mul(2)
            } else {
                value
            }
        };

        if extra_at_start {
            copied.nodes.push(Node {
                pos: 0,
                value: widen(self.value_at_pos(start, loop_length, false)),
                interpolated: self.segment_interpolated_at(start),
            });
        }

        for i in start_i..end_i {
            let node = self.nodes[i];
            let pos = ((node.pos - start) as f32 * scale_factor).round() as i32;
            if copied.nodes.last().is_some_and(|last| last.pos >= pos) {
                continue;
            }
            copied.nodes.push(Node {
                pos,
                value: widen(node.value),
                interpolated: node.interpolated,
            });
        }

        Ok(copied)
    }

    /// Replace `start..end` with `copied`, its positions scaled by
    /// `scale_factor`. Nodes landing at or beyond `end` (or the loop end)
    /// are dropped. Values on both sides of the region are preserved.
    pub fn paste(
        &mut self,
        start: Pos,
        end: Pos,
        scale_factor: f32,
        copied: &CopiedAutomation,
        is_patch_cable: bool,
        loop_length: i32,
    ) -> Result<(), EditError> {
        check_region(start, end - start, loop_length)?;
        if copied.is_empty() {
            log::debug!(target: "automation", "nothing to paste");
            return Ok(());
        }

        let whole_loop = end - start >= loop_length;
        let wrapped_end = end % loop_length;
        let before_pos = if start == 0 { loop_length - 1 } else { start - 1 };

        // A ramp running into the region would otherwise retarget onto the
        // pasted nodes, so pin the value just before it.
        let pin_before = !whole_loop && self.segment_interpolated_at(before_pos);
        let before_value = self.value_at_pos(before_pos, loop_length, false);
        let end_value = self.value_at_pos(wrapped_end, loop_length, false);
        let end_interpolated = self.segment_interpolated_at(wrapped_end);

        self.nodes.try_reserve(copied.nodes.len() + 2)?;

        let (delete_begin, delete_end) = self.nodes.search_dual(start, end);
        self.nodes.delete_at_index(delete_begin, delete_end - delete_begin);

        if !whole_loop {
            if pin_before {
                self.set_node_at_pos(before_pos, before_value, false)?;
            }
            if self.nodes.search_exact(wrapped_end).is_none() {
                self.nodes.insert(Node {
                    pos: wrapped_end,
                    value: end_value,
                    interpolated: end_interpolated,
                })?;
            }
        }

        let max_pos = end.min(loop_length);
        let mut min_pos = start;
        for source in &copied.nodes {
            let new_pos = start + (source.pos as f32 * scale_factor).round() as i32;
            if new_pos < min_pos || new_pos >= max_pos {
                continue;
            }
            let value = if is_patch_cable {
                source.value >> 1
            } else {
                source.value
            };
            self.set_node_at_pos(new_pos, value, source.interpolated)?;
            min_pos = new_pos + 1;
        }

        self.collapse_if_single();
        self.resync_cursor();
        Ok(())
    }
}
