//! Freshness and eviction windows per data category

use std::fmt;
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// How long data stays fresh and how long an unobserved entry survives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age after which data is refetched on the next lookup
    pub stale_time: Duration,
    /// Lifetime of an entry once it has no subscribers
    pub gc_time: Duration,
}

impl CachePolicy {
    pub const fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time,
        }
    }

    const fn secs(stale: u64, gc: u64) -> Self {
        Self::new(Duration::from_secs(stale), Duration::from_secs(gc))
    }
}

/// Always stale, kept five minutes once unobserved. Used for entries that
/// were subscribed to before any query registered a policy.
impl Default for CachePolicy {
    fn default() -> Self {
        Self::secs(0, 5 * MINUTE)
    }
}

/// Data categories with distinct caching needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Current,
    Forecast,
    Geocoding,
    /// Past dates never change
    Historical,
    Marine,
    Flood,
    AirQuality,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Current,
        Self::Forecast,
        Self::Geocoding,
        Self::Historical,
        Self::Marine,
        Self::Flood,
        Self::AirQuality,
    ];

    pub const fn policy(self) -> CachePolicy {
        match self {
            Self::Current => CachePolicy::secs(5 * MINUTE, 30 * MINUTE),
            Self::Forecast => CachePolicy::secs(10 * MINUTE, HOUR),
            Self::Geocoding => CachePolicy::secs(HOUR, DAY),
            Self::Historical => CachePolicy::secs(DAY, 7 * DAY),
            Self::Marine | Self::Flood | Self::AirQuality => CachePolicy::secs(15 * MINUTE, HOUR),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
            Self::Geocoding => "geocoding",
            Self::Historical => "historical",
            Self::Marine => "marine",
            Self::Flood => "flood",
            Self::AirQuality => "air-quality",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
