use trellis_types::{Note, NoteRowId, NoteSequence, Pos};

use super::param_set::ParamSet;
use crate::error::EditError;

/// One row of notes (one pitch or drum) inside a clip, with its own
/// per-row expression parameters.
#[derive(Debug, Clone)]
pub struct NoteRow {
    id: NoteRowId,
    pub(crate) notes: NoteSequence,
    pub params: ParamSet,
}

impl NoteRow {
    pub fn new(id: NoteRowId) -> Self {
        Self {
            id,
            notes: NoteSequence::new(),
            params: ParamSet::new(),
        }
    }

    pub fn id(&self) -> NoteRowId {
        self.id
    }

    pub fn notes(&self) -> &NoteSequence {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteSequence {
        &mut self.notes
    }

    /// Add a note unless one already sounds at `pos`. The length is cut
    /// short so it doesn't run into the next note. Returns the distance to
    /// the next note.
    pub fn attempt_note_add(
        &mut self,
        pos: Pos,
        length: i32,
        velocity: u8,
        loop_length: i32,
    ) -> Result<i32, EditError> {
        if loop_length <= 0 || pos < 0 || pos >= loop_length {
            return Err(EditError::InvalidRegion {
                pos,
                length,
                loop_length,
            });
        }

        let n = self.notes.len();
        let mut distance_to_next = loop_length;

        if n > 0 {
            let i = self.notes.search_geq(pos + 1);

            let (left_i, wrapping_left) = if i == 0 { (n - 1, true) } else { (i - 1, false) };
            let mut left_end = self.notes[left_i].end();
            if wrapping_left {
                left_end -= loop_length;
            }
            if left_end > pos {
                return Err(EditError::Occupied(pos));
            }

            let (right_i, wrapping_right) = if i == n { (0, true) } else { (i, false) };
            let mut right_start = self.notes[right_i].pos;
            if wrapping_right {
                right_start += loop_length;
            }
            distance_to_next = right_start - pos;
        }

        let length = length.min(distance_to_next).max(1);
        self.notes.insert(Note::new(pos, length, velocity))?;
        Ok(distance_to_next)
    }

    pub fn delete_note_at(&mut self, pos: Pos) -> bool {
        self.notes.delete_at_key(pos)
    }

    pub fn set_velocity_at(&mut self, pos: Pos, velocity: u8) -> Result<(), EditError> {
        let i = self
            .notes
            .search_exact(pos)
            .ok_or(EditError::MissingNote(pos))?;
        if let Some(note) = self.notes.get_mut(i) {
            note.velocity = velocity;
        }
        Ok(())
    }

    /// Move the note at `pos` by `offset` ticks, wrapping at the loop end.
    /// Its tail is shortened rather than overlap the next note. Returns the
    /// note's new position.
    pub fn nudge_note(&mut self, pos: Pos, offset: i32, loop_length: i32) -> Result<Pos, EditError> {
        let i = self
            .notes
            .search_exact(pos)
            .ok_or(EditError::MissingNote(pos))?;
        let n = self.notes.len();
        let note = self.notes[i];
        let moved_start = pos + offset;
        let mut length = note.length;

        if n > 1 {
            let next_i = if i + 1 == n { 0 } else { i + 1 };
            let mut next_start = self.notes[next_i].pos;
            if next_i <= i {
                next_start += loop_length;
            }

            let prev_i = if i == 0 { n - 1 } else { i - 1 };
            let mut prev_end = self.notes[prev_i].end();
            if prev_i >= i {
                prev_end -= loop_length;
            }

            if moved_start >= next_start || prev_end > moved_start {
                return Err(EditError::Occupied(moved_start.rem_euclid(loop_length)));
            }
            length = length.min(next_start - moved_start);
        }

        let new_pos = moved_start.rem_euclid(loop_length);
        let new_i = self.notes.move_note(i, new_pos)?;
        if let Some(moved) = self.notes.get_mut(new_i) {
            moved.length = length.max(1);
        }
        Ok(new_pos)
    }

    /// Delete every note starting in `pos..pos + length`, wrapping at
    /// `loop_length`. Returns how many were removed.
    pub fn delete_notes_in_region(&mut self, pos: Pos, length: i32, loop_length: i32) -> usize {
        let before = self.notes.len();
        if length >= loop_length {
            self.notes.clear();
            return before;
        }
        let end = pos + length;
        if end > loop_length {
            let (after_wrap_end, before_wrap_start) = self.notes.search_dual(end - loop_length, pos);
            let len = self.notes.len();
            self.notes.delete_at_index(before_wrap_start, len - before_wrap_start);
            self.notes.delete_at_index(0, after_wrap_end);
        } else {
            let (start_i, end_i) = self.notes.search_dual(pos, end);
            self.notes.delete_at_index(start_i, end_i - start_i);
        }
        before - self.notes.len()
    }

    pub fn shift_horizontal(&mut self, amount: i32, loop_length: i32) {
        self.notes.shift_horizontal(amount, loop_length);
        for (_, curve) in self.params.iter_mut() {
            curve.shift_horizontally(amount, loop_length);
        }
    }

    pub fn generate_repeats(&mut self, old_length: i32, new_length: i32) -> Result<(), EditError> {
        self.notes.generate_repeats(old_length, new_length)?;
        for (_, curve) in self.params.iter_mut() {
            curve.generate_repeats(old_length, new_length)?;
        }
        Ok(())
    }

    /// Drop notes starting at or after `new_length` and stop the last one
    /// from wrapping over the first.
    pub fn trim_to_length(&mut self, new_length: i32, old_length: i32) -> Result<(), EditError> {
        self.notes.truncate_from_key(new_length);
        let first_start = self.notes.first().map(|note| note.pos);
        let last_i = self.notes.len().checked_sub(1);
        if let (Some(first_start), Some(last_i)) = (first_start, last_i) {
            if let Some(last) = self.notes.get_mut(last_i) {
                let limit = new_length + first_start - last.pos;
                last.length = last.length.min(limit).max(1);
            }
        }
        for (_, curve) in self.params.iter_mut() {
            curve.trim_to_length(new_length, old_length)?;
        }
        Ok(())
    }
}
