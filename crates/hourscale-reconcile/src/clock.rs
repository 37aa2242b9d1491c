//! Time source for the reconciler.

use chrono::{DateTime, TimeZone, Utc};

/// Supplies the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A fixed instant at `hour`:00 UTC on an arbitrary day.
    ///
    /// Hours outside 0-23 fall back to midnight.
    pub fn at_hour(hour: u32) -> Self {
        let instant = Utc
            .with_ymd_and_hms(2024, 1, 15, hour, 0, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH);
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
