use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: Uuid,
    pub title: String,
    pub client_id: Uuid,
    pub location: Option<String>,
    pub discipline: String,
    pub experience_level: Option<String>,
    pub hourly_rate: Option<BigDecimal>,
    pub permanent_position: bool,
    /// IANA zone name used to interpret every child shift's local times.
    pub reference_timezone: String,
    pub status: RequisitionStatus,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionInput {
    pub title: String,
    pub client_id: Uuid,
    pub location: Option<String>,
    pub discipline: String,
    pub experience_level: Option<String>,
    pub hourly_rate: Option<BigDecimal>,
    pub permanent_position: bool,
    pub reference_timezone: String,
}

string_enum! {
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum RequisitionStatus {
        Pending => "pending",
        Open => "open",
        Filled => "filled",
        Unfulfilled => "unfulfilled",
        Canceled => "canceled",
    }
}

impl Default for RequisitionStatus {
    fn default() -> Self {
        RequisitionStatus::Pending
    }
}
