use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The binding of one candidate to one recurrence day. At most one workday
/// exists per recurrence day (unique constraint).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workday {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub recurrence_day_id: Option<Uuid>,
    pub candidate_id: Uuid,
    pub timesheet_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
