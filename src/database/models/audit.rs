use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditInput {
    pub actor_id: Option<Uuid>,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub description: String,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

// Common entity types
#[allow(non_snake_case)]
pub mod EntityType {
    pub const REQUISITION: &str = "requisition";
    pub const RECURRENCE_DAY: &str = "recurrence_day";
    pub const WORKDAY: &str = "workday";
    pub const TIMESHEET: &str = "timesheet";
    pub const INVOICE: &str = "invoice";
}

// Common actions
#[allow(non_snake_case)]
pub mod Action {
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const DELETED: &str = "deleted";
    pub const CLAIMED: &str = "claimed";
    pub const CANCELED: &str = "canceled";
    pub const SUBMITTED: &str = "submitted";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
    pub const VOIDED: &str = "voided";
    pub const REVERTED: &str = "reverted";
    pub const OUTDATED: &str = "outdated";
}
