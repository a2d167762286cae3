//! Elapsed-time measurement with explicit handles.
//!
//! Each measurement is an owned [`Timer`]; concurrent callers hold their own
//! handles and cannot corrupt each other's measurements.

use std::fmt;
use std::time::Instant;

/// An in-progress elapsed-time measurement.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_lap: Option<Instant>,
}

impl Timer {
    /// Start a new measurement
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            last_lap: None,
        }
    }

    /// Finish the measurement, consuming the timer
    pub fn stop(self) -> Elapsed {
        self.measure(Instant::now())
    }

    /// Take a lap reading. The timer keeps running and the lap marker
    /// advances to now.
    pub fn lap(&mut self) -> Elapsed {
        let now = Instant::now();
        let elapsed = self.measure(now);
        self.last_lap = Some(now);
        elapsed
    }

    fn measure(&self, end: Instant) -> Elapsed {
        let elapsed_ns = (end - self.start).as_nanos() as u64;
        let since_lap_ns = self.last_lap.map(|lap| (end - lap).as_nanos() as u64);
        Elapsed {
            elapsed_ns,
            since_lap_ns,
        }
    }
}

/// The result of a timer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// Nanoseconds since the timer started
    pub elapsed_ns: u64,
    /// Nanoseconds since the previous lap, if one was taken
    pub since_lap_ns: Option<u64>,
}

impl Elapsed {
    /// Milliseconds since the timer started
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }

    /// Milliseconds since the previous lap, if one was taken
    pub fn since_lap_ms(&self) -> Option<u64> {
        self.since_lap_ns.map(|ns| ns / 1_000_000)
    }

    /// Average elapsed nanoseconds per event
    pub fn avg_ns(&self, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }
        self.elapsed_ns / count
    }

    /// Average elapsed milliseconds per event
    pub fn avg_ms(&self, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }
        self.elapsed_ms() / count
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ns. / [{}] ms.", self.elapsed_ns, self.elapsed_ms())?;
        if let Some(lap_ns) = self.since_lap_ns {
            write!(f, "  lap: [{}] ns. / [{}] ms.", lap_ns, lap_ns / 1_000_000)?;
        }
        Ok(())
    }
}
