use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::database::models::{RecurrenceDay, Timesheet, Workday};
use crate::error::AppError;
use crate::services::time_conversion::{
    elapsed_hours_between, reported_wall_clock, round2, scheduled_max_hours, utc_to_local,
    ShiftWindow,
};

/// Reported start/end may drift this far from the scheduled window before it
/// counts as a mismatch.
pub const TIME_TOLERANCE_MINUTES: i64 = 15;
/// Same tolerance expressed in hours, for the billable-ceiling comparison.
pub const HOURS_TOLERANCE: f64 = 0.25;

/// One submitted entry in a timesheet's raw hours. Older submissions used
/// the legacy `dayStartTime`/`dayEndTime` field names; the aliases absorb
/// them here so nothing downstream branches on shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursEntry {
    pub date: NaiveDate,
    #[serde(alias = "dayStartTime")]
    pub start_time: String,
    #[serde(alias = "dayEndTime")]
    pub end_time: String,
    #[serde(default)]
    pub hours: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    MissingDay,
    TimeMismatch,
    UnscheduledDay,
}

/// One detected mismatch between scheduled and reported hours. Carries both
/// sides so reviewers see what was expected and what came in.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub date: NaiveDate,
    pub scheduled_start: Option<NaiveTime>,
    pub scheduled_end: Option<NaiveTime>,
    pub scheduled_hours: Option<f64>,
    pub reported_start: Option<String>,
    pub reported_end: Option<String>,
    pub reported_hours: Option<f64>,
}

pub fn parse_hours_entries(hours_raw: &serde_json::Value) -> Result<Vec<HoursEntry>, AppError> {
    serde_json::from_value(hours_raw.clone())
        .map_err(|e| AppError::Validation(format!("unreadable hours entries: {}", e)))
}

/// Reconcile a timesheet's reported entries against the shifts scheduled for
/// its week. Pure: no I/O, no status changes. An empty result means
/// everything lines up; a non-empty one is advisory until a reviewer acts.
pub fn validate_timesheet(
    timesheet: &Timesheet,
    scheduled_days: &[RecurrenceDay],
    workdays: &[Workday],
    reference_timezone: &str,
) -> Result<Vec<Discrepancy>, AppError> {
    let entries = parse_hours_entries(&timesheet.hours_raw)?;
    let week_end = timesheet.week_begin_date + chrono::Duration::days(7);

    // Only shifts this candidate actually holds count as scheduled.
    let claimed: Vec<&RecurrenceDay> = scheduled_days
        .iter()
        .filter(|day| {
            day.date >= timesheet.week_begin_date
                && day.date < week_end
                && workdays.iter().any(|w| {
                    w.recurrence_day_id == Some(day.id) && w.candidate_id == timesheet.candidate_id
                })
        })
        .collect();

    let mut discrepancies = Vec::new();

    for day in &claimed {
        let window = ShiftWindow::from(*day);
        let (_, scheduled_start) = utc_to_local(window.day_start, reference_timezone)?;
        let (_, scheduled_end) = utc_to_local(window.day_end, reference_timezone)?;
        let max_hours = scheduled_max_hours(&window);

        let Some(entry) = entries.iter().find(|e| e.date == day.date) else {
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::MissingDay,
                date: day.date,
                scheduled_start: Some(scheduled_start),
                scheduled_end: Some(scheduled_end),
                scheduled_hours: Some(max_hours),
                reported_start: None,
                reported_end: None,
                reported_hours: None,
            });
            continue;
        };

        let reported_start = reported_wall_clock(&entry.start_time, reference_timezone)?;
        let reported_end = reported_wall_clock(&entry.end_time, reference_timezone)?;
        let reported_hours = match entry.hours {
            Some(hours) => round2(hours),
            None => elapsed_hours_between(&entry.start_time, &entry.end_time)?,
        };

        let start_drift = (reported_start - scheduled_start).num_minutes().abs();
        let end_drift = (reported_end - scheduled_end).num_minutes().abs();
        let over_ceiling = reported_hours > max_hours + HOURS_TOLERANCE;

        if start_drift > TIME_TOLERANCE_MINUTES || end_drift > TIME_TOLERANCE_MINUTES || over_ceiling
        {
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::TimeMismatch,
                date: day.date,
                scheduled_start: Some(scheduled_start),
                scheduled_end: Some(scheduled_end),
                scheduled_hours: Some(max_hours),
                reported_start: Some(entry.start_time.clone()),
                reported_end: Some(entry.end_time.clone()),
                reported_hours: Some(reported_hours),
            });
        }
    }

    for entry in &entries {
        if !claimed.iter().any(|day| day.date == entry.date) {
            let reported_hours = match entry.hours {
                Some(hours) => Some(round2(hours)),
                None => elapsed_hours_between(&entry.start_time, &entry.end_time).ok(),
            };
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::UnscheduledDay,
                date: entry.date,
                scheduled_start: None,
                scheduled_end: None,
                scheduled_hours: None,
                reported_start: Some(entry.start_time.clone()),
                reported_end: Some(entry.end_time.clone()),
                reported_hours,
            });
        }
    }

    discrepancies.sort_by_key(|d| d.date);
    Ok(discrepancies)
}

/// Sum of reported hours across entries, rounded to 2 decimals. Entries
/// without an explicit hours figure fall back to their elapsed span.
pub fn total_reported_hours(entries: &[HoursEntry]) -> Result<f64, AppError> {
    let mut total = 0.0;
    for entry in entries {
        total += match entry.hours {
            Some(hours) => hours,
            None => elapsed_hours_between(&entry.start_time, &entry.end_time)?,
        };
    }
    Ok(round2(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use uuid::Uuid;

    use crate::database::models::{RecurrenceDayStatus, TimesheetStatus};

    const ZONE: &str = "America/New_York";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn scheduled_day(id: Uuid, requisition_id: Uuid, d: NaiveDate) -> RecurrenceDay {
        // Local 08:00-16:00 EDT with 12:00-12:30 lunch
        let base = d.format("%Y-%m-%d").to_string();
        RecurrenceDay {
            id,
            requisition_id,
            date: d,
            day_start: instant(&format!("{}T12:00:00Z", base)),
            day_end: instant(&format!("{}T20:00:00Z", base)),
            lunch_start: Some(instant(&format!("{}T16:00:00Z", base))),
            lunch_end: Some(instant(&format!("{}T16:30:00Z", base))),
            status: RecurrenceDayStatus::Filled,
            archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn workday_for(day: &RecurrenceDay, candidate_id: Uuid, timesheet_id: Uuid) -> Workday {
        Workday {
            id: Uuid::new_v4(),
            requisition_id: day.requisition_id,
            recurrence_day_id: Some(day.id),
            candidate_id,
            timesheet_id: Some(timesheet_id),
            created_at: Utc::now(),
        }
    }

    fn timesheet_with(
        candidate_id: Uuid,
        requisition_id: Uuid,
        week_begin: NaiveDate,
        hours_raw: serde_json::Value,
    ) -> Timesheet {
        Timesheet {
            id: Uuid::new_v4(),
            candidate_id,
            requisition_id,
            week_begin_date: week_begin,
            hours_raw,
            total_hours_worked: BigDecimal::from_str("0").unwrap(),
            total_hours_billed: BigDecimal::from_str("0").unwrap(),
            candidate_rate_base: None,
            candidate_rate_ot: None,
            status: TimesheetStatus::Pending,
            validated: false,
            awaiting_client_signature: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn clean_week_reconciles_to_empty() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:00", "endTime": "16:00", "hours": 7.5}
            ]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result, vec![]);
    }

    #[test]
    fn missing_entry_is_a_missing_day() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, DiscrepancyKind::MissingDay);
        assert_eq!(result[0].date, date(2024, 6, 3));
        assert_eq!(result[0].scheduled_hours, Some(7.5));
    }

    #[test]
    fn drifted_times_are_a_mismatch_with_both_sides_carried() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "09:00", "endTime": "16:00", "hours": 6.5}
            ]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, DiscrepancyKind::TimeMismatch);
        assert_eq!(result[0].reported_start.as_deref(), Some("09:00"));
        assert_eq!(
            result[0].scheduled_start,
            Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap())
        );
    }

    #[test]
    fn small_drift_within_tolerance_passes() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:10", "endTime": "16:05", "hours": 7.4}
            ]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result, vec![]);
    }

    #[test]
    fn hours_over_the_scheduled_ceiling_are_a_mismatch() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:00", "endTime": "16:00", "hours": 9.0}
            ]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, DiscrepancyKind::TimeMismatch);
        assert_eq!(result[0].reported_hours, Some(9.0));
        assert_eq!(result[0].scheduled_hours, Some(7.5));
    }

    #[test]
    fn entry_without_a_shift_is_unscheduled() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:00", "endTime": "16:00", "hours": 7.5},
                {"date": "2024-06-04", "startTime": "08:00", "endTime": "12:00", "hours": 4.0}
            ]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, DiscrepancyKind::UnscheduledDay);
        assert_eq!(result[0].date, date(2024, 6, 4));
    }

    #[test]
    fn shift_claimed_by_someone_else_does_not_count_as_scheduled() {
        let candidate = Uuid::new_v4();
        let other_candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:00", "endTime": "16:00", "hours": 7.5}
            ]),
        );
        // The only workday on that shift belongs to another candidate.
        let workdays = vec![workday_for(&day, other_candidate, Uuid::new_v4())];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, DiscrepancyKind::UnscheduledDay);
    }

    #[test]
    fn legacy_entry_field_names_are_accepted() {
        let candidate = Uuid::new_v4();
        let requisition = Uuid::new_v4();
        let day = scheduled_day(Uuid::new_v4(), requisition, date(2024, 6, 3));
        let timesheet = timesheet_with(
            candidate,
            requisition,
            date(2024, 6, 2),
            serde_json::json!([
                {"date": "2024-06-03", "dayStartTime": "08:00", "dayEndTime": "16:00", "hours": 7.5}
            ]),
        );
        let workdays = vec![workday_for(&day, candidate, timesheet.id)];

        let result = validate_timesheet(&timesheet, &[day], &workdays, ZONE).unwrap();
        assert_eq!(result, vec![]);
    }

    #[test]
    fn total_reported_hours_falls_back_to_elapsed() {
        let entries = vec![
            HoursEntry {
                date: date(2024, 6, 3),
                start_time: "08:00".to_string(),
                end_time: "16:00".to_string(),
                hours: Some(7.5),
            },
            HoursEntry {
                date: date(2024, 6, 4),
                start_time: "09:00".to_string(),
                end_time: "13:30".to_string(),
                hours: None,
            },
        ];
        assert_eq!(total_reported_hours(&entries).unwrap(), 12.0);
    }
}
