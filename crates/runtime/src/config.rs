//! Runtime configuration.
//!
//! Defaults suit an interactive sheet; every field can be overridden from the
//! environment (a `.env` file is loaded by the binary).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sheet_core::UndoPolicy;

const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Root of the character store and content overrides.
    pub data_dir: PathBuf,
    /// Quiet period before a changed character is written.
    pub autosave_debounce: Duration,
    /// Overrides the undo policy from `config.toml` when set.
    pub undo_policy: Option<UndoPolicy>,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            undo_policy: None,
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

impl RuntimeConfig {
    /// Environment variable for the data directory.
    pub const DATA_DIR_ENV: &'static str = "SHEET_DATA_DIR";
    /// Environment variable for the autosave debounce, in milliseconds.
    pub const AUTOSAVE_DEBOUNCE_ENV: &'static str = "SHEET_AUTOSAVE_DEBOUNCE_MS";
    /// Environment variable for the undo policy (`anyRecord`, `mostRecentOnly`).
    pub const UNDO_POLICY_ENV: &'static str = "SHEET_UNDO_POLICY";
    /// Environment variable for the per-topic event buffer.
    pub const EVENT_BUFFER_ENV: &'static str = "SHEET_EVENT_BUFFER";

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            data_dir: read_env::<PathBuf>(Self::DATA_DIR_ENV).unwrap_or(defaults.data_dir),
            autosave_debounce: read_env::<u64>(Self::AUTOSAVE_DEBOUNCE_ENV)
                .map(Duration::from_millis)
                .unwrap_or(defaults.autosave_debounce),
            undo_policy: read_env::<UndoPolicy>(Self::UNDO_POLICY_ENV).or(defaults.undo_policy),
            event_buffer_size: read_env::<usize>(Self::EVENT_BUFFER_ENV)
                .unwrap_or(defaults.event_buffer_size),
            command_buffer_size: defaults.command_buffer_size,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_autosave_debounce(mut self, debounce: Duration) -> Self {
        self.autosave_debounce = debounce;
        self
    }

    pub fn with_undo_policy(mut self, policy: UndoPolicy) -> Self {
        self.undo_policy = Some(policy);
        self
    }
}

/// Platform data directory for sheets, e.g. `~/.local/share/vtm-sheet` on Linux.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "vtm-sheet")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./sheet_data"))
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}
