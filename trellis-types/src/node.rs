use serde::{Deserialize, Serialize};

use crate::sequence::Keyed;
use crate::Pos;

/// One automation keyframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Position in ticks, relative to the start of the owning loop
    pub pos: Pos,
    /// Target value. The full `i32` range is used.
    pub value: i32,
    /// Ramp linearly from this node's value to the next node's value
    pub interpolated: bool,
}

impl Node {
    pub fn new(pos: Pos, value: i32) -> Self {
        Self {
            pos,
            value,
            interpolated: false,
        }
    }

    pub fn interpolating(pos: Pos, value: i32) -> Self {
        Self {
            pos,
            value,
            interpolated: true,
        }
    }
}

impl Keyed for Node {
    fn key(&self) -> i32 {
        self.pos
    }

    fn set_key(&mut self, key: i32) {
        self.pos = key;
    }
}
