pub mod clip;
pub mod note_row;
pub mod param_set;
pub mod song;

pub use clip::Clip;
pub use note_row::NoteRow;
pub use param_set::{ParamAddress, ParamCollection, ParamSet};
pub use song::{Song, MAX_SWING};

use trellis_types::{ClipId, NoteRowId, SampleTime};

use crate::action_log::{ActionLog, Direction, Target};
use crate::automation::CopiedAutomation;
use crate::config::Config;
use crate::error::EditError;

/// Top-level context: the song, its undo history and the sample clock.
/// Every core operation takes this by reference; there is no global state.
pub struct AppState {
    pub song: Song,
    pub action_log: ActionLog,
    /// Audio samples rendered since startup
    pub sample_timer: SampleTime,
    /// Set while the storage routine runs. Undo and redo are refused.
    pub in_card_routine: bool,
    /// Last automation copied for pasting
    pub clipboard: Option<CopiedAutomation>,
    pub config: Config,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let mut song = Song::new();
        song.set_swing(config.default_swing());
        song.time_per_big = config.default_time_per_big();
        Self {
            song,
            action_log: ActionLog::new(config.max_undo_depth()),
            sample_timer: 0,
            in_card_routine: false,
            clipboard: None,
            config,
        }
    }

    /// Advance the sample clock and every playing curve. Returns how many
    /// curves changed value.
    pub fn tick_samples(&mut self, num_samples: u32) -> usize {
        self.sample_timer += u64::from(num_samples);
        self.song.tick_samples(num_samples)
    }

    /// Start every curve playing from `pos`.
    pub fn start_playback(&mut self, pos: i32) {
        let samples_per_tick = self.config.samples_per_tick();
        let song_loop = self.config.default_loop_length();
        self.song
            .params
            .set_play_pos(pos.rem_euclid(song_loop), song_loop, false, samples_per_tick);
        for clip in self.song.clips_mut() {
            let pos = pos.rem_euclid(clip.loop_length());
            clip.set_play_pos(pos, false, samples_per_tick);
        }
    }

    pub fn stop_playback(&mut self) {
        self.song.params.stop_playback();
        for clip in self.song.clips_mut() {
            clip.stop_playback();
        }
    }

    fn check_reversion_allowed(&self, allowed: bool) -> Result<(), EditError> {
        if !allowed || self.in_card_routine {
            log::warn!(target: "action_log", "reversion refused (allowed: {}, in card routine: {})", allowed, self.in_card_routine);
            return Err(EditError::ReversionBlocked);
        }
        Ok(())
    }

    /// Undo the newest Action. `allowed` is the caller's say on whether
    /// the current interaction permits it. Returns whether anything changed.
    pub fn undo(&mut self, allowed: bool) -> Result<bool, EditError> {
        self.check_reversion_allowed(allowed)?;
        Ok(self.action_log.revert(Direction::Before, &mut self.song))
    }

    pub fn redo(&mut self, allowed: bool) -> Result<bool, EditError> {
        self.check_reversion_allowed(allowed)?;
        Ok(self.action_log.revert(Direction::After, &mut self.song))
    }

    /// Remove a clip, dropping any undo records that point into it.
    pub fn remove_clip(&mut self, clip: ClipId) -> Result<Clip, EditError> {
        let removed = self
            .song
            .remove_clip(clip)
            .ok_or(EditError::MissingClip(clip))?;
        self.action_log.notify_target_destroyed(Target::Clip(clip));
        Ok(removed)
    }

    pub fn remove_note_row(&mut self, clip: ClipId, row: NoteRowId) -> Result<NoteRow, EditError> {
        let removed = self
            .song
            .clip_mut(clip)
            .ok_or(EditError::MissingClip(clip))?
            .remove_note_row(row)
            .ok_or(EditError::MissingNoteRow { clip, row })?;
        self.action_log
            .notify_target_destroyed(Target::NoteRow(clip, row));
        Ok(removed)
    }

    pub fn remove_param(&mut self, address: ParamAddress) -> Result<(), EditError> {
        self.song
            .param_set_mut(address.collection)
            .and_then(|set| set.remove(address.param))
            .ok_or(EditError::MissingParam(address.param))?;
        self.action_log
            .notify_target_destroyed(Target::Param(address));
        Ok(())
    }
}
