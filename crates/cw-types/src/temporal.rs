use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Wall-clock timestamp in milliseconds since the UNIX epoch.
///
/// Stored as a plain 64-bit integer so the durable snapshot round-trips
/// exactly. Ledger mutations stamp themselves with [`Timestamp::advance`],
/// which keeps successive stamps strictly increasing even when the wall
/// clock stalls or steps backwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// The zero timestamp.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// A stamp for a new mutation following `self`: the current time, or
    /// one millisecond after `self` if the clock has not moved past it.
    pub fn advance(&self) -> Self {
        let now = Self::now();
        if now > *self {
            now
        } else {
            Self(self.0.saturating_add(1))
        }
    }

    /// Returns `true` if this stamp is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }

    /// Local-time rendering used by viewers, `yyyy-mm-dd HH:MM:SS`.
    pub fn format_local(&self) -> String {
        match Local.timestamp_millis_opt(self.0 as i64).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
