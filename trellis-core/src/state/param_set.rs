use std::collections::BTreeMap;

use trellis_types::{ClipId, NoteRowId, ParamId};

use crate::automation::AutomationCurve;

/// Which collection of parameters a [`ParamId`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamCollection {
    Song,
    Clip(ClipId),
    /// Per-row expression lanes
    NoteRow(ClipId, NoteRowId),
}

impl ParamCollection {
    pub fn clip(&self) -> Option<ClipId> {
        match self {
            ParamCollection::Song => None,
            ParamCollection::Clip(clip) | ParamCollection::NoteRow(clip, _) => Some(*clip),
        }
    }
}

/// Stable address of one automatable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamAddress {
    pub collection: ParamCollection,
    pub param: ParamId,
}

impl ParamAddress {
    pub fn song(param: ParamId) -> Self {
        Self {
            collection: ParamCollection::Song,
            param,
        }
    }

    pub fn clip(clip: ClipId, param: ParamId) -> Self {
        Self {
            collection: ParamCollection::Clip(clip),
            param,
        }
    }

    pub fn note_row(clip: ClipId, row: NoteRowId, param: ParamId) -> Self {
        Self {
            collection: ParamCollection::NoteRow(clip, row),
            param,
        }
    }
}

impl std::fmt::Display for ParamAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.collection {
            ParamCollection::Song => write!(f, "song/{}", self.param),
            ParamCollection::Clip(clip) => write!(f, "clip {}/{}", clip, self.param),
            ParamCollection::NoteRow(clip, row) => {
                write!(f, "clip {} row {}/{}", clip, row, self.param)
            }
        }
    }
}

/// The automation curves of one collection, keyed by parameter.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    curves: BTreeMap<ParamId, AutomationCurve>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, param: ParamId) -> Option<&AutomationCurve> {
        self.curves.get(&param)
    }

    pub fn get_mut(&mut self, param: ParamId) -> Option<&mut AutomationCurve> {
        self.curves.get_mut(&param)
    }

    /// Add a parameter with an unautomated starting value. An existing
    /// curve is left untouched.
    pub fn add(&mut self, param: ParamId, value: i32) -> &mut AutomationCurve {
        self.curves
            .entry(param)
            .or_insert_with(|| AutomationCurve::new(value))
    }

    pub fn remove(&mut self, param: ParamId) -> Option<AutomationCurve> {
        self.curves.remove(&param)
    }

    pub fn ids(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.curves.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ParamId, &mut AutomationCurve)> {
        self.curves.iter_mut().map(|(id, curve)| (*id, curve))
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Whether any parameter differs from `neutral_value`.
    pub fn contains_something(&self, neutral_value: i32) -> bool {
        self.curves
            .values()
            .any(|curve| curve.contains_something(neutral_value))
    }

    pub fn set_play_pos(&mut self, pos: i32, loop_length: i32, reversed: bool, samples_per_tick: u32) {
        for curve in self.curves.values_mut() {
            curve.set_play_pos(pos, loop_length, reversed, samples_per_tick);
        }
    }

    pub fn stop_playback(&mut self) {
        for curve in self.curves.values_mut() {
            curve.stop_playback();
        }
    }

    /// Tick every playing curve. Returns how many changed value.
    pub fn tick_samples(&mut self, num_samples: u32) -> usize {
        self.curves
            .values_mut()
            .filter(|curve| curve.is_playing())
            .map(|curve| curve.tick_samples(num_samples))
            .filter(|changed| *changed)
            .count()
    }
}
