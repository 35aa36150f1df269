use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Invoice, InvoiceInput};

const INVOICE_COLUMNS: &str = "id, invoice_number, status, source_type, amount_due, amount_paid, amount_remaining, subtotal, total, tax_amount, client_id, candidate_id, requisition_id, timesheet_id, external_invoice_id, hosted_invoice_url, pdf_url, created_at, updated_at";

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Numbering comes from a database sequence so concurrent approvals
    /// never collide: INV-YYYYMM-00042.
    pub async fn create_invoice(&self, input: InvoiceInput) -> Result<Invoice, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_number, status, source_type,
                amount_due, amount_paid, amount_remaining, subtotal, total, tax_amount,
                client_id, candidate_id, requisition_id, timesheet_id,
                external_invoice_id, hosted_invoice_url, pdf_url,
                created_at, updated_at
            )
            VALUES (
                'INV-' || to_char($15::timestamptz, 'YYYYMM') || '-' || lpad(nextval('invoice_number_seq')::text, 5, '0'),
                $1, $2, $3, 0, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14
            )
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(input.status)
        .bind(input.source_type)
        .bind(input.amount_due)
        .bind(input.subtotal)
        .bind(input.total)
        .bind(input.tax_amount)
        .bind(input.client_id)
        .bind(input.candidate_id)
        .bind(input.requisition_id)
        .bind(input.timesheet_id)
        .bind(input.external_invoice_id)
        .bind(input.hosted_invoice_url)
        .bind(input.pdf_url)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// The idempotency probe: at most one invoice per timesheet.
    pub async fn find_by_timesheet(&self, timesheet_id: Uuid) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE timesheet_id = $1"
        ))
        .bind(timesheet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    pub async fn get_invoices(&self, client_id: Option<Uuid>) -> Result<Vec<Invoice>> {
        let invoices = if let Some(client_id) = client_id {
            sqlx::query_as::<_, Invoice>(&format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices WHERE client_id = $1 ORDER BY created_at DESC"
            ))
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Invoice>(&format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        Ok(invoices)
    }
}
