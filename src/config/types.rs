//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "brawl-tracker";

/// Game log location relative to the home directory.
const GAME_LOG_RELATIVE: &[&str] = &[
    "AppData",
    "LocalLow",
    "Good Luck Games",
    "Storybook Brawl",
    "Player.log",
];

/// Top-level tracker configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub tail: TailConfig,
    pub ingest: IngestConfig,
}

/// Where and how to tail the game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailConfig {
    /// Game log to follow.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// File holding the persisted read offset.
    #[serde(default = "default_offset_path")]
    pub offset_path: PathBuf,
    /// Delay between polls with no new data.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Also wake on filesystem events.
    #[serde(default)]
    pub watch_events: bool,
}

impl TailConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_log_path() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_default();
    GAME_LOG_RELATIVE.iter().fold(base, |path, part| path.join(part))
}

fn default_offset_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_default()
        .join(APP_DIR)
        .join("offset")
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            offset_path: default_offset_path(),
            poll_interval_ms: default_poll_interval_ms(),
            watch_events: false,
        }
    }
}

/// Job channel and aggregation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Jobs a consumer may fall behind before it starts losing them.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Players per lobby.
    #[serde(default = "default_expected_players")]
    pub expected_players: usize,
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_expected_players() -> usize {
    8
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            expected_players: default_expected_players(),
        }
    }
}
