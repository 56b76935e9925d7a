//! # trellis-core
//!
//! The automation and undo engine of a step sequencer: automation curves,
//! the song model that owns them, and a coalescing undo/redo log whose
//! snapshots are swapped, never copied, back into the live song.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trellis_core::config::Config;
//! use trellis_core::dispatch::dispatch_edit;
//! use trellis_core::edit::{Edit, SongEdit};
//! use trellis_core::state::AppState;
//!
//! let mut state = AppState::new(Config::load());
//! let result = dispatch_edit(&Edit::Song(SongEdit::SetSwing(12)), &mut state)?;
//! assert!(result.recorded);
//! state.undo(true)?;
//! ```
//!
//! ## Module Overview
//!
//! - [`automation`]: `AutomationCurve` node editing, value lookup,
//!   real-time ticking, node stealing, copy/paste
//! - [`action_log`]: `ActionLog`, `Action`, `Consequence`
//! - [`state`]: `AppState`, `Song`, `Clip`, `NoteRow`, `ParamSet`
//! - [`edit`] / [`dispatch`]: edit commands and `dispatch_edit()`, which
//!   records undo state before mutating
//! - [`config`]: TOML configuration (embedded defaults + user override)

pub mod action_log;
pub mod automation;
pub mod config;
pub mod dispatch;
pub mod edit;
pub mod error;
pub mod state;

pub use error::{ConfigError, EditError};

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
