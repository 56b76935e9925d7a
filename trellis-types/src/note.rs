use std::ops::{Deref, Range};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::sequence::{Keyed, PositionIndexedSequence};
use crate::{Pos, SequenceError};

pub const DEFAULT_VELOCITY: u8 = 64;
pub const DEFAULT_LIFT: u8 = 64;
/// Probability value meaning "always plays". Lower values are twentieths.
pub const PROBABILITY_ALWAYS: u8 = 20;

/// Iteration dependence: play only on selected repeats out of every
/// `divisor` loop repeats. A divisor of 0 disables the check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Iterance {
    pub divisor: u8,
    /// Bit `n` set means "play on repeat `n` of each group of `divisor`"
    pub mask: u8,
}

impl Iterance {
    pub const OFF: Iterance = Iterance { divisor: 0, mask: 0 };

    pub fn new(divisor: u8, mask: u8) -> Self {
        Self {
            divisor: divisor.min(8),
            mask,
        }
    }

    pub fn is_off(self) -> bool {
        self.divisor == 0
    }

    pub fn passes(self, repeat_count: u32) -> bool {
        if self.divisor == 0 {
            return true;
        }
        let slot = repeat_count % u32::from(self.divisor);
        self.mask & (1 << slot) != 0
    }
}

/// One note event within a note row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub pos: Pos,
    pub length: i32,
    pub velocity: u8,
    pub probability: u8,
    #[serde(default)]
    pub iterance: Iterance,
    /// MPE release velocity
    pub lift: u8,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            pos: 0,
            length: 1,
            velocity: DEFAULT_VELOCITY,
            probability: PROBABILITY_ALWAYS,
            iterance: Iterance::OFF,
            lift: DEFAULT_LIFT,
        }
    }
}

impl Note {
    pub fn new(pos: Pos, length: i32, velocity: u8) -> Self {
        Self {
            pos,
            length: length.max(1),
            velocity,
            ..Self::default()
        }
    }

    pub fn end(&self) -> Pos {
        self.pos + self.length
    }
}

impl Keyed for Note {
    fn key(&self) -> i32 {
        self.pos
    }

    fn set_key(&mut self, key: i32) {
        self.pos = key;
    }
}

/// The notes of one row, ordered by start position with no two notes
/// sharing a start.
///
/// Read access (searching, iteration) goes through `Deref` to the underlying
/// sequence. Every mutation is routed through this type so duplicate starts
/// are refused with [`SequenceError::InvariantViolation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSequence {
    notes: PositionIndexedSequence<Note>,
}

impl Deref for NoteSequence {
    type Target = PositionIndexedSequence<Note>;

    fn deref(&self) -> &Self::Target {
        &self.notes
    }
}

impl NoteSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sorted(notes: Vec<Note>) -> Result<Self, SequenceError> {
        let notes = PositionIndexedSequence::from_sorted(notes)?;
        notes.check_sequentiality(true)?;
        Ok(Self { notes })
    }

    /// Insert a note, refusing one whose start is already taken.
    pub fn insert(&mut self, note: Note) -> Result<usize, SequenceError> {
        let i = self.notes.search_geq(note.pos);
        if i < self.notes.len() && self.notes.key_at(i) == note.pos {
            log::error!(target: "sequence", "refusing duplicate note start {}", note.pos);
            return Err(SequenceError::InvariantViolation {
                index: i,
                key: note.pos,
            });
        }
        self.notes.insert_at_index(i, note)?;
        Ok(i)
    }

    /// Append while reconstructing a row. Starts must be strictly increasing.
    pub fn push_in_order(&mut self, note: Note) -> Result<usize, SequenceError> {
        if let Some(last) = self.notes.last() {
            if last.pos >= note.pos {
                return Err(SequenceError::InvariantViolation {
                    index: self.notes.len(),
                    key: note.pos,
                });
            }
        }
        self.notes.push_in_order(note)
    }

    /// Mutable access to a note's payload. The start position must not change;
    /// use [`NoteSequence::move_note`] for that.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Note> {
        self.notes.get_mut(index)
    }

    /// Move the note at `index` to `new_pos`, keeping order. Fails without
    /// changes if `new_pos` is taken by another note.
    pub fn move_note(&mut self, index: usize, new_pos: Pos) -> Result<usize, SequenceError> {
        let Some(&note) = self.notes.get(index) else {
            return Err(SequenceError::InvariantViolation {
                index,
                key: new_pos,
            });
        };
        if let Some(existing) = self.notes.search_exact(new_pos) {
            if existing != index {
                return Err(SequenceError::InvariantViolation {
                    index: existing,
                    key: new_pos,
                });
            }
            return Ok(index);
        }
        // Reserve for the reinsertion before removing anything
        self.notes.try_reserve(1)?;
        self.notes.delete_at_index(index, 1);
        let moved = Note { pos: new_pos, ..note };
        self.insert(moved)
    }

    pub fn delete_at_key(&mut self, pos: Pos) -> bool {
        self.notes.delete_at_key(pos)
    }

    pub fn delete_at_index(&mut self, index: usize, count: usize) {
        self.notes.delete_at_index(index, count);
    }

    pub fn drain_range(&mut self, range: Range<usize>) -> impl Iterator<Item = Note> + '_ {
        self.notes.drain_range(range)
    }

    pub fn truncate_from_key(&mut self, pos: Pos) {
        self.notes.truncate_from_key(pos);
    }

    pub fn shift_horizontal(&mut self, amount: i32, effective_length: i32) {
        self.notes.shift_horizontal(amount, effective_length);
    }

    pub fn generate_repeats(&mut self, wrap_point: i32, end_pos: i32) -> Result<(), SequenceError> {
        self.notes.generate_repeats(wrap_point, end_pos)
    }

    pub fn try_clone(&self) -> Result<Self, SequenceError> {
        Ok(Self {
            notes: self.notes.try_clone()?,
        })
    }

    pub fn swap_with(&mut self, other: &mut Self) {
        self.notes.swap_with(&mut other.notes);
    }

    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }
}

impl Serialize for NoteSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.notes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NoteSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let notes = PositionIndexedSequence::<Note>::deserialize(deserializer)?;
        notes.check_sequentiality(true).map_err(D::Error::custom)?;
        Ok(Self { notes })
    }
}
