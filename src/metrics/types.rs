//! Metric type variants and their update/reset rules.
//!
//! The numeric rules live here as pure functions over [`Accum`], the single
//! dispatch table for variant behavior.

use crate::core::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of metric variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Running count/avg/max/min over values seen this window; fully reset
    Avg,
    /// Like [`Avg`](Self::Avg), but the count survives reset
    Sticky,
    /// Values are cumulative raw readings; aggregates the deltas between
    /// consecutive readings; fully reset
    Delta,
    /// Like [`Delta`](Self::Delta), but the count survives reset
    DeltaSticky,
    /// Only counts `process` calls; avg/max/min unused; fully reset
    IntervalCount,
}

impl MetricType {
    /// All variants, in wire-code order
    pub const ALL: [MetricType; 5] = [
        MetricType::Avg,
        MetricType::Sticky,
        MetricType::Delta,
        MetricType::DeltaSticky,
        MetricType::IntervalCount,
    ];

    /// The stable wire code for this variant
    pub const fn code(&self) -> u8 {
        match self {
            MetricType::Avg => 0,
            MetricType::Sticky => 1,
            MetricType::Delta => 2,
            MetricType::DeltaSticky => 3,
            MetricType::IntervalCount => 4,
        }
    }

    /// Decode a wire code. Unknown codes fail; nothing is guessed.
    pub fn decode_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(StatsError::UnknownMetricTypeCode(code))
    }

    /// Decode a type name, trimmed and case-insensitive. Unknown names fail;
    /// nothing is guessed.
    pub fn decode_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AVG" => Ok(MetricType::Avg),
            "STICKY" => Ok(MetricType::Sticky),
            "DELTA" => Ok(MetricType::Delta),
            "DELTASTICKY" => Ok(MetricType::DeltaSticky),
            "INTERVALCOUNT" => Ok(MetricType::IntervalCount),
            _ => Err(StatsError::UnknownMetricType(name.trim().to_string())),
        }
    }

    /// The canonical variant name
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricType::Avg => "AVG",
            MetricType::Sticky => "STICKY",
            MetricType::Delta => "DELTA",
            MetricType::DeltaSticky => "DELTASTICKY",
            MetricType::IntervalCount => "INTERVALCOUNT",
        }
    }

    const fn is_delta(&self) -> bool {
        matches!(self, MetricType::Delta | MetricType::DeltaSticky)
    }

    const fn is_sticky(&self) -> bool {
        matches!(self, MetricType::Sticky | MetricType::DeltaSticky)
    }

    /// Apply one raw value to an open accumulator.
    pub(crate) fn update(&self, acc: &mut Accum, value: i64) {
        match self {
            MetricType::IntervalCount => {
                acc.count += 1;
            },
            MetricType::Avg | MetricType::Sticky => acc.fold(value),
            MetricType::Delta | MetricType::DeltaSticky => match acc.prev_raw {
                // First reading after a reset establishes the baseline and
                // contributes no delta.
                None => acc.prev_raw = Some(value),
                Some(prev) => {
                    acc.prev_raw = Some(value);
                    acc.fold(value - prev);
                },
            },
        }
    }

    /// The accumulator for the next window, carried from a closed one.
    pub(crate) fn carry(&self, closed: &Accum) -> Accum {
        let mut next = Accum::default();
        if self.is_sticky() {
            next.count = closed.count;
        }
        // Delta baselines do not survive reset: the first reading of the new
        // window re-establishes them.
        debug_assert!(!self.is_delta() || next.prev_raw.is_none());
        next
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulator state for one open window.
///
/// `average` is maintained incrementally (`avg += (v - avg) / (n + 1)`) so
/// large windows cannot overflow a running sum. `window_values` counts values
/// folded this window and drives the mean; `count` is the reported count,
/// which for sticky variants includes the carried prior-window count.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Accum {
    /// Set by reset to divert racing producers to the new window
    pub sealed: bool,
    /// Reported event count
    pub count: u64,
    /// Values folded into avg/max/min this window
    pub window_values: u64,
    /// Incrementally maintained mean of folded values
    pub average: f64,
    /// Maximum folded value, valid when `window_values > 0`
    pub maximum: i64,
    /// Minimum folded value, valid when `window_values > 0`
    pub minimum: i64,
    /// Previous raw reading for delta variants
    pub prev_raw: Option<i64>,
}

impl Accum {
    /// Fold one value into avg/max/min and bump the counts. The first value
    /// of a window initializes max/min rather than comparing against a
    /// sentinel.
    fn fold(&mut self, value: i64) {
        self.average += (value as f64 - self.average) / (self.window_values as f64 + 1.0);
        if self.window_values == 0 {
            self.maximum = value;
            self.minimum = value;
        } else {
            self.maximum = self.maximum.max(value);
            self.minimum = self.minimum.min(value);
        }
        self.window_values += 1;
        self.count += 1;
    }
}
