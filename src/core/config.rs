//! Configuration for the tickstats runtime.
//!
//! All settings are read once at startup and are not hot-reloadable.
//! Supports YAML files, a builder for programmatic construction, and
//! validation with defaults.

use crate::core::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default interval period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(15_000);
/// Default journal stream name.
pub const DEFAULT_JOURNAL_NAME: &str = "jmxstats";
/// Default journal directory name under the user's home directory.
pub const DEFAULT_JOURNAL_DIR: &str = ".jmxstats";
/// Default journal entry count estimate used to size the initial index.
pub const DEFAULT_SIZE_HINT: u64 = 100;

/// Complete configuration for a [`StatsRuntime`](crate::runtime::StatsRuntime).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interval scheduling configuration
    pub interval: IntervalConfig,
    /// Journal configuration
    pub journal: JournalConfig,
    /// Clock source selection
    pub clock: ClockMode,
}

/// Interval scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Fixed rotation period. Changing the period of a running scheduler is
    /// unsupported; a new runtime must be started.
    #[serde(with = "humantime_serde")]
    pub period: Duration,
}

/// Journal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding the journal files
    pub data_dir: PathBuf,
    /// Journal stream name, used as the file stem
    pub name: String,
    /// Estimated number of entries, used to preallocate the index
    pub size_hint: u64,
}

/// Which clock implementation the runtime starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Wall-clock time
    Wall,
    /// Process start time plus elapsed monotonic time
    Offset,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interval: IntervalConfig::default(),
            journal: JournalConfig::default(),
            clock: ClockMode::Wall,
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        IntervalConfig {
            period: DEFAULT_PERIOD,
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            data_dir: default_data_dir(),
            name: DEFAULT_JOURNAL_NAME.to_string(),
            size_hint: DEFAULT_SIZE_HINT,
        }
    }
}

/// The default journal directory: a dot-directory under the user's home,
/// falling back to the current directory when no home is known.
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_JOURNAL_DIR)
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| StatsError::config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let period_ms = self.interval.period.as_millis() as u64;
        if period_ms < 1 {
            return Err(StatsError::InvalidPeriod(period_ms));
        }

        if self.journal.name.is_empty() {
            return Err(StatsError::config("journal name must not be empty"));
        }

        if self.journal.size_hint == 0 {
            return Err(StatsError::config("journal size_hint must be greater than 0"));
        }

        Ok(())
    }

    /// The rotation period in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.interval.period.as_millis() as u64
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder seeded with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rotation period
    pub fn period(mut self, period: Duration) -> Self {
        self.config.interval.period = period;
        self
    }

    /// Set the journal directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.journal.data_dir = dir.into();
        self
    }

    /// Set the journal stream name
    pub fn journal_name(mut self, name: impl Into<String>) -> Self {
        self.config.journal.name = name.into();
        self
    }

    /// Set the journal size hint
    pub fn size_hint(mut self, hint: u64) -> Self {
        self.config.journal.size_hint = hint;
        self
    }

    /// Set the starting clock mode
    pub fn clock(mut self, mode: ClockMode) -> Self {
        self.config.clock = mode;
        self
    }

    /// Validate and build the configuration. An invalid setting fails the
    /// build; nothing is applied partially.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
