use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

/// One calendar shift instance under a requisition. All instants are UTC,
/// derived from the requisition's reference timezone at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceDay {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub date: NaiveDate,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub lunch_start: Option<DateTime<Utc>>,
    pub lunch_end: Option<DateTime<Utc>>,
    pub status: RecurrenceDayStatus,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-authored local wall-clock times for one shift. Converted to UTC
/// through the requisition's reference timezone before insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceDayInput {
    pub date: NaiveDate,
    pub day_start: String,
    pub day_end: String,
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
}

string_enum! {
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum RecurrenceDayStatus {
        Open => "open",
        Filled => "filled",
        Unfulfilled => "unfulfilled",
        Canceled => "canceled",
    }
}

impl Default for RecurrenceDayStatus {
    fn default() -> Self {
        RecurrenceDayStatus::Open
    }
}
