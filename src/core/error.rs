use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("Journal directory {} exists but is not a directory", .path.display())]
    JournalNotADirectory { path: PathBuf },

    #[error("Unknown metric type: {0}")]
    UnknownMetricType(String),

    #[error("Metric type code {0} does not map to a metric type")]
    UnknownMetricTypeCode(u8),

    #[error("Metric '{name}' already registered as {existing}, requested {requested}")]
    MetricTypeConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("Metric id collision: '{name}' hashes to the same id as '{existing}'")]
    MetricIdCollision { name: String, existing: String },

    #[error("Record index {index} out of range: journal holds {count} entries")]
    RecordOutOfRange { index: u64, count: u64 },

    #[error("Interval period must be at least 1ms, got {0}ms")]
    InvalidPeriod(u64),

    #[error("Scheduler is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for tickstats operations
pub type Result<T> = std::result::Result<T, StatsError>;

impl StatsError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new journal error
    pub fn journal<S: Into<String>>(msg: S) -> Self {
        Self::Journal(msg.into())
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::InvalidPeriod(_) => "config",
            Self::Journal(_) | Self::JournalNotADirectory { .. } | Self::RecordOutOfRange { .. } => {
                "journal"
            },
            Self::UnknownMetricType(_)
            | Self::UnknownMetricTypeCode(_)
            | Self::MetricTypeConflict { .. }
            | Self::MetricIdCollision { .. } => "metric",
            Self::NotRunning => "scheduler",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Join(_) => "async",
        }
    }
}
