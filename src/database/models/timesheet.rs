use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

/// One candidate's reported hours for one week (Sunday-based) against one
/// requisition. `hours_raw` holds the candidate-submitted entries as JSON;
/// older rows may carry the legacy field shape, normalized on read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub requisition_id: Uuid,
    pub week_begin_date: NaiveDate,
    pub hours_raw: serde_json::Value,
    pub total_hours_worked: BigDecimal,
    pub total_hours_billed: BigDecimal,
    pub candidate_rate_base: Option<BigDecimal>,
    pub candidate_rate_ot: Option<BigDecimal>,
    pub status: TimesheetStatus,
    pub validated: bool,
    pub awaiting_client_signature: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetSubmission {
    pub hours_raw: Vec<serde_json::Value>,
    pub candidate_rate_base: BigDecimal,
    pub candidate_rate_ot: BigDecimal,
}

string_enum! {
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum TimesheetStatus {
        Draft => "draft",
        Pending => "pending",
        Approved => "approved",
        Discrepancy => "discrepancy",
        Rejected => "rejected",
        Void => "void",
    }
}

impl Default for TimesheetStatus {
    fn default() -> Self {
        TimesheetStatus::Draft
    }
}
