//! Recency buckets derived from an entity's last update.
//!
//! Temperature is a view, not a field: it is recomputed from `updatedAt`
//! every time it is needed and never written back to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// How recently something was touched, hottest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Temperature {
    Hot,
    Warm,
    Tepid,
    Cold,
    Freezing,
    Frozen,
}

/// Inclusive upper bound in days for each bucket, ascending.
/// Anything older than the last bound is `Frozen`.
const BUCKETS: [(f64, Temperature); 5] = [
    (1.0, Temperature::Hot),
    (3.0, Temperature::Warm),
    (7.0, Temperature::Tepid),
    (14.0, Temperature::Cold),
    (30.0, Temperature::Freezing),
];

impl Temperature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Tepid => "tepid",
            Self::Cold => "cold",
            Self::Freezing => "freezing",
            Self::Frozen => "frozen",
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify the age of `updated_at` relative to `now`.
///
/// Timestamps in the future have a negative age and count as hot.
pub fn derive_temperature(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> Temperature {
    let age_days = (now - updated_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
    BUCKETS
        .iter()
        .find(|(bound, _)| age_days <= *bound)
        .map(|(_, temperature)| *temperature)
        .unwrap_or(Temperature::Frozen)
}

/// Like [`derive_temperature`], for a timestamp that has not been parsed yet.
///
/// Accepts RFC 3339 strings. Anything else is an [`Error::InvalidTimestamp`].
pub fn derive_temperature_str(updated_at: &str, now: DateTime<Utc>) -> Result<Temperature> {
    let parsed = DateTime::parse_from_rfc3339(updated_at.trim()).map_err(|_| {
        Error::InvalidTimestamp {
            value: updated_at.to_string(),
        }
    })?;
    Ok(derive_temperature(parsed.with_timezone(&Utc), now))
}
