use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

/// The settlement artifact. Amount columns are NUMERIC; once the external
/// invoice is finalized they are never rewritten. Status mirrors the
/// provider's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub source_type: InvoiceSourceType,
    pub amount_due: BigDecimal,
    pub amount_paid: BigDecimal,
    pub amount_remaining: BigDecimal,
    pub subtotal: BigDecimal,
    pub total: BigDecimal,
    pub tax_amount: BigDecimal,
    pub client_id: Uuid,
    pub candidate_id: Option<Uuid>,
    pub requisition_id: Option<Uuid>,
    pub timesheet_id: Option<Uuid>,
    pub external_invoice_id: Option<String>,
    pub hosted_invoice_url: Option<String>,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    pub status: InvoiceStatus,
    pub source_type: InvoiceSourceType,
    pub amount_due: BigDecimal,
    pub subtotal: BigDecimal,
    pub total: BigDecimal,
    pub tax_amount: BigDecimal,
    pub client_id: Uuid,
    pub candidate_id: Option<Uuid>,
    pub requisition_id: Option<Uuid>,
    pub timesheet_id: Option<Uuid>,
    pub external_invoice_id: Option<String>,
    pub hosted_invoice_url: Option<String>,
    pub pdf_url: Option<String>,
}

string_enum! {
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum InvoiceStatus {
        Draft => "draft",
        Open => "open",
        Paid => "paid",
        Uncollectible => "uncollectible",
        Void => "void",
    }
}

string_enum! {
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum InvoiceSourceType {
        Timesheet => "timesheet",
        Manual => "manual",
        Recurring => "recurring",
        Other => "other",
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}
