use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

/// Platform fee configuration. A single row, read at approval time and
/// passed into the settlement computation as a parameter.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminFeeConfig {
    pub id: Uuid,
    pub fee_amount: BigDecimal,
    pub fee_type: FeeType,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFeeConfigInput {
    pub fee_amount: BigDecimal,
    pub fee_type: FeeType,
}

string_enum! {
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum FeeType {
        Percentage => "percentage",
        Fixed => "fixed",
    }
}
