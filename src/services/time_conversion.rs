//! Wall-clock/UTC conversion and shift-hours arithmetic.
//!
//! Client-authored shift times are local wall clock in the requisition's
//! IANA zone; everything stored is UTC. Conversions here apply the zone's
//! offset for the specific date (DST-correct), never a fixed offset.
//! Ambiguous local times (fall-back) resolve to the earliest instant;
//! nonexistent local times (spring-forward gap) are an error.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::database::models::RecurrenceDay;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("nonexistent local time: {0}")]
    NonexistentLocalTime(String),
}

fn wall_clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d(:[0-5]\d)?$").unwrap())
}

/// Parse a bare `HH:MM` or `HH:MM:SS` wall-clock value.
pub fn parse_wall_clock(time: &str) -> Result<NaiveTime, TimeError> {
    if !wall_clock_pattern().is_match(time) {
        return Err(TimeError::InvalidTimeFormat(time.to_string()));
    }
    NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| TimeError::InvalidTimeFormat(time.to_string()))
}

fn parse_zone(zone: &str) -> Result<Tz, TimeError> {
    zone.parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimezone(zone.to_string()))
}

/// Interpret `time` as wall clock in `zone` on `date` and return the UTC instant.
pub fn local_to_utc(date: NaiveDate, time: &str, zone: &str) -> Result<DateTime<Utc>, TimeError> {
    let tz = parse_zone(zone)?;
    let naive = date.and_time(parse_wall_clock(time)?);

    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Fall-back repeats an hour; the earliest instant wins.
        chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        chrono::LocalResult::None => Err(TimeError::NonexistentLocalTime(format!(
            "{} {} in {}",
            date, time, zone
        ))),
    }
}

/// Inverse of [`local_to_utc`]: the local calendar date and wall clock for
/// `instant` in `zone`.
pub fn utc_to_local(
    instant: DateTime<Utc>,
    zone: &str,
) -> Result<(NaiveDate, NaiveTime), TimeError> {
    let tz = parse_zone(zone)?;
    let local = instant.with_timezone(&tz);
    Ok((local.date_naive(), local.time()))
}

/// Hours between two bare wall-clock values. An `end` earlier than `start`
/// is read as crossing midnight and gains 24 hours; shifts that span
/// midnight are reported this way.
pub fn elapsed_hours_between(start: &str, end: &str) -> Result<f64, TimeError> {
    let start = parse_wall_clock(start)?;
    let end = parse_wall_clock(end)?;

    let mut seconds = (end - start).num_seconds();
    if seconds < 0 {
        seconds += 24 * 3600;
    }
    Ok(round2(seconds as f64 / 3600.0))
}

/// Hours between two absolute instants. A negative span wraps by +24h for
/// parity with the wall-clock rule; known quirk, kept deliberately.
pub fn elapsed_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let mut hours = (end - start).num_seconds() as f64 / 3600.0;
    if hours < 0.0 {
        hours += 24.0;
    }
    round2(hours)
}

/// Sunday that begins the week containing `date`.
pub fn week_begin(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date - chrono::Duration::days(date.weekday().num_days_from_sunday() as i64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Canonical internal shape for one shift's window. Everything downstream
/// of the data-access boundary sees only this.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftWindow {
    pub date: NaiveDate,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub lunch_start: Option<DateTime<Utc>>,
    pub lunch_end: Option<DateTime<Utc>>,
}

impl From<&RecurrenceDay> for ShiftWindow {
    fn from(day: &RecurrenceDay) -> Self {
        ShiftWindow {
            date: day.date,
            day_start: day.day_start,
            day_end: day.day_end,
            lunch_start: day.lunch_start,
            lunch_end: day.lunch_end,
        }
    }
}

/// Scheduled ceiling for one shift: day span minus lunch span, rounded to
/// two decimals. The single source for "how many hours can this shift bill".
pub fn scheduled_max_hours(window: &ShiftWindow) -> f64 {
    let gross = elapsed_hours(window.day_start, window.day_end);
    let lunch = match (window.lunch_start, window.lunch_end) {
        (Some(start), Some(end)) => elapsed_hours(start, end),
        _ => 0.0,
    };
    round2(gross - lunch)
}

/// A shift's times as found in stored JSON. Two generations coexist: the
/// current grouped UTC instants (`dayStart`/`dayEnd`) and the legacy
/// `dayStartTime`/`dayEndTime` strings, which may be full RFC 3339
/// timestamps or bare `HH:MM` wall clock. [`RawShiftTimes::normalize`] is
/// the one place that resolves them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShiftTimes {
    pub date: NaiveDate,
    #[serde(default)]
    pub day_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub day_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub day_start_time: Option<String>,
    #[serde(default)]
    pub day_end_time: Option<String>,
    #[serde(default)]
    pub lunch_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lunch_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lunch_start_time: Option<String>,
    #[serde(default)]
    pub lunch_end_time: Option<String>,
}

impl RawShiftTimes {
    pub fn normalize(&self, zone: &str) -> Result<ShiftWindow, TimeError> {
        let day_start =
            resolve_instant(self.day_start, self.day_start_time.as_deref(), self.date, zone)?
                .ok_or_else(|| TimeError::InvalidTimeFormat("missing day start".to_string()))?;
        let day_end = resolve_instant(self.day_end, self.day_end_time.as_deref(), self.date, zone)?
            .ok_or_else(|| TimeError::InvalidTimeFormat("missing day end".to_string()))?;
        let lunch_start = resolve_instant(
            self.lunch_start,
            self.lunch_start_time.as_deref(),
            self.date,
            zone,
        )?;
        let lunch_end = resolve_instant(
            self.lunch_end,
            self.lunch_end_time.as_deref(),
            self.date,
            zone,
        )?;

        Ok(ShiftWindow {
            date: self.date,
            day_start,
            day_end,
            lunch_start,
            lunch_end,
        })
    }
}

fn resolve_instant(
    current: Option<DateTime<Utc>>,
    legacy: Option<&str>,
    date: NaiveDate,
    zone: &str,
) -> Result<Option<DateTime<Utc>>, TimeError> {
    if let Some(instant) = current {
        return Ok(Some(instant));
    }
    match legacy {
        None => Ok(None),
        Some(value) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            local_to_utc(date, value, zone).map(Some)
        }
    }
}

/// Reported start/end values in timesheet entries may be bare wall clock or
/// full timestamps; resolve either to local wall clock in `zone`.
pub fn reported_wall_clock(value: &str, zone: &str) -> Result<NaiveTime, TimeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        let (_, time) = utc_to_local(dt.with_timezone(&Utc), zone)?;
        return Ok(time);
    }
    parse_wall_clock(value)
}
