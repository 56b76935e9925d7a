use trellis_types::{ClipId, NoteRowId, ViewState};

use super::clip::Clip;
use super::note_row::NoteRow;
use super::param_set::{ParamAddress, ParamCollection, ParamSet};
use crate::automation::AutomationCurve;

/// Swing is stored as an offset from straight (50%).
pub const MAX_SWING: i8 = 49;

#[derive(Debug, Clone)]
pub struct Song {
    clips: Vec<Clip>,
    pub params: ParamSet,
    pub swing: i8,
    /// Samples per big tick, the tempo in fixed point
    pub time_per_big: u64,
    pub view: ViewState,
    next_clip_id: u32,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            params: ParamSet::new(),
            swing: 0,
            time_per_big: 1000,
            view: ViewState::default(),
            next_clip_id: 0,
        }
    }
}

impl Song {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, loop_length: i32) -> ClipId {
        let id = ClipId::new(self.next_clip_id);
        self.next_clip_id += 1;
        self.clips.push(Clip::new(id, loop_length));
        id
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id() == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|clip| clip.id() == id)
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    pub fn clips_mut(&mut self) -> impl Iterator<Item = &mut Clip> {
        self.clips.iter_mut()
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<Clip> {
        let i = self.clips.iter().position(|clip| clip.id() == id)?;
        Some(self.clips.remove(i))
    }

    pub fn note_row(&self, clip: ClipId, row: NoteRowId) -> Option<&NoteRow> {
        self.clip(clip)?.note_row(row)
    }

    pub fn note_row_mut(&mut self, clip: ClipId, row: NoteRowId) -> Option<&mut NoteRow> {
        self.clip_mut(clip)?.note_row_mut(row)
    }

    pub fn param_set(&self, collection: ParamCollection) -> Option<&ParamSet> {
        match collection {
            ParamCollection::Song => Some(&self.params),
            ParamCollection::Clip(clip) => Some(&self.clip(clip)?.params),
            ParamCollection::NoteRow(clip, row) => Some(&self.note_row(clip, row)?.params),
        }
    }

    pub fn param_set_mut(&mut self, collection: ParamCollection) -> Option<&mut ParamSet> {
        match collection {
            ParamCollection::Song => Some(&mut self.params),
            ParamCollection::Clip(clip) => Some(&mut self.clip_mut(clip)?.params),
            ParamCollection::NoteRow(clip, row) => {
                Some(&mut self.note_row_mut(clip, row)?.params)
            }
        }
    }

    pub fn curve(&self, address: &ParamAddress) -> Option<&AutomationCurve> {
        self.param_set(address.collection)?.get(address.param)
    }

    pub fn curve_mut(&mut self, address: &ParamAddress) -> Option<&mut AutomationCurve> {
        self.param_set_mut(address.collection)?.get_mut(address.param)
    }

    /// Loop length that positions of `collection` wrap at. Song-level
    /// parameters wrap at `default_length`.
    pub fn loop_length_for(&self, collection: ParamCollection, default_length: i32) -> Option<i32> {
        match collection.clip() {
            Some(clip) => Some(self.clip(clip)?.loop_length()),
            None => Some(default_length),
        }
    }

    pub fn set_swing(&mut self, swing: i8) {
        self.swing = swing.clamp(-MAX_SWING, MAX_SWING);
    }

    /// Ticks every playing curve of the song. Returns how many changed.
    pub fn tick_samples(&mut self, num_samples: u32) -> usize {
        let mut changed = self.params.tick_samples(num_samples);
        for clip in self.clips.iter_mut() {
            changed += clip.tick_samples(num_samples);
        }
        changed
    }
}
