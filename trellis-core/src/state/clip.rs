use trellis_types::{ClipId, NoteRowId};

use super::note_row::NoteRow;
use super::param_set::ParamSet;
use crate::error::EditError;

/// A looping pattern: note rows plus clip-level automation.
#[derive(Debug, Clone)]
pub struct Clip {
    id: ClipId,
    pub(crate) loop_length: i32,
    rows: Vec<NoteRow>,
    pub params: ParamSet,
    next_row_id: u32,
}

impl Clip {
    pub fn new(id: ClipId, loop_length: i32) -> Self {
        Self {
            id,
            loop_length: loop_length.max(1),
            rows: Vec::new(),
            params: ParamSet::new(),
            next_row_id: 0,
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn loop_length(&self) -> i32 {
        self.loop_length
    }

    /// Add an empty row. Row ids are never reused within a clip.
    pub fn add_note_row(&mut self) -> NoteRowId {
        let id = NoteRowId::new(self.next_row_id);
        self.next_row_id += 1;
        self.rows.push(NoteRow::new(id));
        id
    }

    pub fn note_row(&self, id: NoteRowId) -> Option<&NoteRow> {
        self.rows.iter().find(|row| row.id() == id)
    }

    pub fn note_row_mut(&mut self, id: NoteRowId) -> Option<&mut NoteRow> {
        self.rows.iter_mut().find(|row| row.id() == id)
    }

    pub fn note_rows(&self) -> impl Iterator<Item = &NoteRow> {
        self.rows.iter()
    }

    pub fn note_rows_mut(&mut self) -> impl Iterator<Item = &mut NoteRow> {
        self.rows.iter_mut()
    }

    pub fn remove_note_row(&mut self, id: NoteRowId) -> Option<NoteRow> {
        let i = self.rows.iter().position(|row| row.id() == id)?;
        Some(self.rows.remove(i))
    }

    /// Change the loop length, repeating content when growing and trimming
    /// it when shrinking.
    pub fn set_loop_length(&mut self, new_length: i32) -> Result<(), EditError> {
        if new_length <= 0 {
            return Err(EditError::InvalidRegion {
                pos: 0,
                length: new_length,
                loop_length: self.loop_length,
            });
        }
        let old_length = self.loop_length;
        if new_length > old_length {
            for row in self.rows.iter_mut() {
                row.generate_repeats(old_length, new_length)?;
            }
            for (_, curve) in self.params.iter_mut() {
                curve.generate_repeats(old_length, new_length)?;
            }
        } else if new_length < old_length {
            for row in self.rows.iter_mut() {
                row.trim_to_length(new_length, old_length)?;
            }
            for (_, curve) in self.params.iter_mut() {
                curve.trim_to_length(new_length, old_length)?;
            }
        }
        self.loop_length = new_length;
        Ok(())
    }

    pub fn stop_playback(&mut self) {
        self.params.stop_playback();
        for row in self.rows.iter_mut() {
            row.params.stop_playback();
        }
    }

    pub fn set_play_pos(&mut self, pos: i32, reversed: bool, samples_per_tick: u32) {
        let loop_length = self.loop_length;
        self.params
            .set_play_pos(pos, loop_length, reversed, samples_per_tick);
        for row in self.rows.iter_mut() {
            row.params
                .set_play_pos(pos, loop_length, reversed, samples_per_tick);
        }
    }

    pub fn tick_samples(&mut self, num_samples: u32) -> usize {
        let mut changed = self.params.tick_samples(num_samples);
        for row in self.rows.iter_mut() {
            changed += row.params.tick_samples(num_samples);
        }
        changed
    }
}
