use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Fallback loop length in ticks when nothing else is configured.
pub const DEFAULT_LOOP_LENGTH: i32 = 384;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    history: HistoryConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    defaults: DefaultsConfig,
}

#[derive(Deserialize, Default)]
struct HistoryConfig {
    max_depth: Option<usize>,
}

#[derive(Deserialize, Default)]
struct PlaybackConfig {
    samples_per_tick: Option<u32>,
    override_hold_samples: Option<u32>,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    loop_length: Option<i32>,
    swing: Option<i8>,
    time_per_big: Option<u64>,
}

pub struct Config {
    history: HistoryConfig,
    playback: PlaybackConfig,
    defaults: DefaultsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Config {
    /// Embedded defaults merged with the user's config file, if one exists
    /// and parses. Problems with the user file are logged and skipped.
    pub fn load() -> Self {
        let mut config = Self::embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_config_file(&path) {
                    Ok(user) => config.merge(user),
                    Err(e) => log::warn!(target: "config", "ignoring user config: {}", e),
                }
            }
        }

        config
    }

    /// Embedded defaults merged with the file at `path`. Unlike
    /// [`Config::load`], a bad file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let user = read_config_file(path)?;
        let mut config = Self::embedded();
        config.merge(user);
        Ok(config)
    }

    /// Embedded defaults merged with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::embedded();
        config.merge(user);
        Ok(config)
    }

    fn embedded() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Config {
            history: base.history,
            playback: base.playback,
            defaults: base.defaults,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_history(&mut self.history, user.history);
        merge_playback(&mut self.playback, user.playback);
        merge_defaults(&mut self.defaults, user.defaults);
    }

    /// Undo steps to keep. 0 means unlimited.
    pub fn max_undo_depth(&self) -> usize {
        self.history.max_depth.unwrap_or(64)
    }

    pub fn samples_per_tick(&self) -> u32 {
        self.playback.samples_per_tick.unwrap_or(1000).max(1)
    }

    pub fn override_hold_samples(&self) -> u32 {
        self.playback.override_hold_samples.unwrap_or(44_100)
    }

    /// Default loop length for new clips, clamped to at least one tick.
    pub fn default_loop_length(&self) -> i32 {
        self.defaults
            .loop_length
            .unwrap_or(DEFAULT_LOOP_LENGTH)
            .max(1)
    }

    /// Default swing amount (-49..=49).
    pub fn default_swing(&self) -> i8 {
        self.defaults.swing.unwrap_or(0).clamp(-49, 49)
    }

    pub fn default_time_per_big(&self) -> u64 {
        self.defaults.time_per_big.unwrap_or(1000).max(1)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("trellis").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_history(base: &mut HistoryConfig, user: HistoryConfig) {
    if user.max_depth.is_some() {
        base.max_depth = user.max_depth;
    }
}

fn merge_playback(base: &mut PlaybackConfig, user: PlaybackConfig) {
    if user.samples_per_tick.is_some() {
        base.samples_per_tick = user.samples_per_tick;
    }
    if user.override_hold_samples.is_some() {
        base.override_hold_samples = user.override_hold_samples;
    }
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.loop_length.is_some() {
        base.loop_length = user.loop_length;
    }
    if user.swing.is_some() {
        base.swing = user.swing;
    }
    if user.time_per_big.is_some() {
        base.time_per_big = user.time_per_big;
    }
}
