//! Core domain types for tickstats: configuration and errors.

pub mod config;
pub mod error;

pub use config::{ClockMode, Config, ConfigBuilder};
pub use error::{Result, StatsError};
