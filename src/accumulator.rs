//! Running-time and cost accounting across power cycles.
//!
//! Holds a single optional start timestamp. Everything else is pure arithmetic over
//! `(start, end)`, so callers pass the end time explicitly.

use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, offset};
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Hourly price of the instance plan, in yen.
pub const DEFAULT_HOURLY_RATE: f64 = 7.5;

/// Shown for timestamps that do not exist yet (and for cost without a start).
pub const NOT_STARTED: &str = "未起動";
const NOT_MEASURED: &str = "未計測";

const DISPLAY_OFFSET: UtcOffset = offset!(+9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elapsed {
    NotMeasured,
    Measured { hours: i64, minutes: u8, seconds: u8 },
}

impl Elapsed {
    pub fn from_duration(d: Duration) -> Self {
        let total = d.whole_seconds().max(0);
        Elapsed::Measured {
            hours: total / 3600,
            minutes: ((total % 3600) / 60) as u8,
            seconds: (total % 60) as u8,
        }
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Elapsed::NotMeasured => f.write_str(NOT_MEASURED),
            Elapsed::Measured {
                hours,
                minutes,
                seconds,
            } => write!(f, "{hours}時間{minutes}分{seconds}秒"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cost {
    NotStarted,
    Billed { hours: i64, hourly_rate: f64 },
}

impl Cost {
    /// Partial hours bill as a full hour; a zero-length session bills nothing.
    pub fn from_duration(d: Duration, hourly_rate: f64) -> Self {
        const HOUR_NANOS: i128 = 3_600_000_000_000;
        let nanos = d.whole_nanoseconds().max(0);
        let hours = ((nanos + HOUR_NANOS - 1) / HOUR_NANOS) as i64;
        Cost::Billed { hours, hourly_rate }
    }

    pub fn total(&self) -> Option<f64> {
        match self {
            Cost::NotStarted => None,
            Cost::Billed { hours, hourly_rate } => Some(*hours as f64 * hourly_rate),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::NotStarted => f.write_str(NOT_STARTED),
            Cost::Billed { hours, hourly_rate } => write!(
                f,
                "{hours}時間 × {hourly_rate}円 = {}円",
                *hours as f64 * hourly_rate
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Accumulator {
    start_time: Option<OffsetDateTime>,
    hourly_rate: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(DEFAULT_HOURLY_RATE)
    }
}

impl Accumulator {
    pub fn new(hourly_rate: f64) -> Self {
        Self {
            start_time: None,
            hourly_rate,
        }
    }

    pub fn start_time(&self) -> Option<OffsetDateTime> {
        self.start_time
    }

    /// Last write wins.
    pub fn set_start_time(&mut self, t: OffsetDateTime) {
        self.start_time = Some(t);
    }

    pub fn reset_start_time(&mut self) {
        self.start_time = None;
    }

    pub fn calculate_elapsed_time(&self, end: OffsetDateTime) -> Elapsed {
        match self.start_time {
            None => Elapsed::NotMeasured,
            Some(start) => Elapsed::from_duration(end - start),
        }
    }

    pub fn calculate_cost(&self, end: OffsetDateTime) -> Cost {
        match self.start_time {
            None => Cost::NotStarted,
            Some(start) => Cost::from_duration(end - start, self.hourly_rate),
        }
    }
}

/// Render an API timestamp in Japan time as `YYYY/MM/DD HH:MM:SS`.
///
/// Accepts RFC 3339 and the compute API's offset-less form
/// (`2024-01-02T03:04:05.000000`), which is read as UTC. Anything else is returned as-is.
pub fn format_date(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return NOT_STARTED.to_string();
    };
    let Some(parsed) = parse_timestamp(raw) else {
        tracing::debug!(value = raw, "unrecognized timestamp format");
        return raw.to_string();
    };
    parsed
        .to_offset(DISPLAY_OFFSET)
        .format(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| raw.to_string())
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(t);
    }
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}
