use trellis_types::{Node, Pos, SequenceError};

use super::{check_region, AutomationCurve};
use crate::error::EditError;

/// Nodes moved out of a curve region, keyed relative to the region start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StolenNodes {
    nodes: Vec<Node>,
}

impl StolenNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }
}

impl AutomationCurve {
    /// Move every node in `pos..pos + region_length` (wrapping at
    /// `loop_length`) into `record`. Anything already in `record` is dropped.
    pub fn steal_nodes(
        &mut self,
        pos: Pos,
        region_length: i32,
        loop_length: i32,
        record: &mut StolenNodes,
    ) -> Result<(), EditError> {
        check_region(pos, region_length, loop_length)?;
        let stop_at = pos + region_length;
        let duration_after_wrap = stop_at - loop_length;

        let (begin_i, end_i) = self.nodes.search_dual(pos, stop_at);
        let num_after_wrap = if duration_after_wrap > 0 {
            self.nodes.search_geq(duration_after_wrap).min(begin_i)
        } else {
            0
        };

        record.nodes.clear();
        record
            .nodes
            .try_reserve_exact(end_i - begin_i + num_after_wrap)
            .map_err(SequenceError::from)?;

        let rekey = |mut node: Node| {
            node.pos -= pos;
            if node.pos < 0 {
                node.pos += loop_length;
            }
            node
        };
        record
            .nodes
            .extend(self.nodes.drain_range(begin_i..end_i).map(rekey));
        record
            .nodes
            .extend(self.nodes.drain_range(0..num_after_wrap).map(rekey));

        log::debug!(target: "automation", "stole {} nodes from {}+{}", record.nodes.len(), pos, region_length);
        self.resync_cursor();
        Ok(())
    }

    /// Clear `pos..pos + region_length` and move the nodes of `record` into it.
    /// Stolen nodes that fall beyond the region are discarded. `record` is
    /// empty afterwards.
    pub fn insert_stolen_nodes(
        &mut self,
        pos: Pos,
        region_length: i32,
        loop_length: i32,
        record: &mut StolenNodes,
    ) -> Result<(), EditError> {
        check_region(pos, region_length, loop_length)?;
        let region_length = region_length.min(loop_length);

        let fitting = record
            .nodes
            .iter()
            .take_while(|node| node.pos < region_length)
            .count();
        self.nodes.try_reserve(fitting)?;

        self.remove_region(pos, region_length, loop_length);

        for node in record.nodes.drain(..).take(fitting) {
            let mut dest_pos = node.pos + pos;
            if dest_pos >= loop_length {
                dest_pos -= loop_length;
            }
            self.nodes.insert(Node {
                pos: dest_pos,
                ..node
            })?;
        }

        self.resync_cursor();
        Ok(())
    }
}
