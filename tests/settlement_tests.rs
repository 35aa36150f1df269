mod common;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use common::{date, seed_candidate, seed_client, seed_day, seed_open_requisition, seed_staff};
use dentalinkr::database::models::{AdminFeeConfig, FeeType, TimesheetStatus};
use dentalinkr::database::repositories::{
    AuditRepository, ClientRepository, InvoiceRepository, RequisitionRepository,
    TimesheetRepository,
};
use dentalinkr::error::AppError;
use dentalinkr::services::billing::{
    BillingProvider, ExternalCustomer, ExternalInvoice, ExternalLineItem,
};
use dentalinkr::services::{AuditLogger, ClaimService, Notifier, SettlementService};

/// Provider double that always fails, for exercising the rollback path.
#[derive(Clone)]
struct FailingBilling;

impl BillingProvider for FailingBilling {
    async fn create_invoice(
        &self,
        _customer_handle: &str,
        _line_items: &[ExternalLineItem],
        _metadata: &HashMap<String, String>,
        _due_date: Option<DateTime<Utc>>,
    ) -> Result<ExternalInvoice, AppError> {
        Err(AppError::ExternalProviderError(
            "forced provider failure".to_string(),
        ))
    }

    async fn retrieve_customer(&self, handle: &str) -> Result<ExternalCustomer, AppError> {
        Ok(ExternalCustomer {
            email: format!("{}@example.com", handle),
            deleted: false,
        })
    }
}

/// Provider double that succeeds and records every invoice total it saw.
#[derive(Clone, Default)]
struct RecordingBilling {
    calls: Arc<AtomicUsize>,
    totals: Arc<Mutex<Vec<i64>>>,
}

impl BillingProvider for RecordingBilling {
    async fn create_invoice(
        &self,
        _customer_handle: &str,
        line_items: &[ExternalLineItem],
        _metadata: &HashMap<String, String>,
        _due_date: Option<DateTime<Utc>>,
    ) -> Result<ExternalInvoice, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let total: i64 = line_items.iter().map(|item| item.amount_cents).sum();
        self.totals.lock().unwrap().push(total);
        Ok(ExternalInvoice {
            external_id: format!("in_{}", Uuid::new_v4().simple()),
            hosted_url: Some("https://billing.example.com/i/test".to_string()),
            pdf_url: Some("https://billing.example.com/i/test/pdf".to_string()),
            amount_due_cents: total,
        })
    }

    async fn retrieve_customer(&self, handle: &str) -> Result<ExternalCustomer, AppError> {
        Ok(ExternalCustomer {
            email: format!("{}@example.com", handle),
            deleted: false,
        })
    }
}

fn settlement_with<B: BillingProvider>(pool: &PgPool, billing: B) -> SettlementService<B> {
    SettlementService::new(
        TimesheetRepository::new(pool.clone()),
        InvoiceRepository::new(pool.clone()),
        RequisitionRepository::new(pool.clone()),
        ClientRepository::new(pool.clone()),
        AuditLogger::new(AuditRepository::new(pool.clone())),
        billing,
    )
}

fn percentage_fee(percent: &str) -> AdminFeeConfig {
    AdminFeeConfig {
        id: Uuid::new_v4(),
        fee_amount: BigDecimal::from_str(percent).unwrap(),
        fee_type: FeeType::Percentage,
        updated_at: Utc::now(),
    }
}

/// Claim a shift and submit the week's hours, returning the timesheet id.
async fn claimed_and_submitted(pool: &PgPool, billing_handle: Option<&str>) -> Uuid {
    let client = seed_client(pool, billing_handle).await;
    let (_, candidate) = seed_candidate(pool, "hygienist@example.com").await;
    let requisition = seed_open_requisition(pool, client.id).await;
    let day = seed_day(pool, requisition.id, date(2024, 6, 3)).await;

    let claim_service = ClaimService::new(
        pool.clone(),
        ClientRepository::new(pool.clone()),
        Notifier::new(None),
    );
    let outcome = claim_service.claim_shift(&candidate, day.id).await.unwrap();

    TimesheetRepository::new(pool.clone())
        .submit(
            outcome.timesheet.id,
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:00", "endTime": "16:00", "hours": 7.5}
            ]),
            BigDecimal::from_str("7.5").unwrap(),
            BigDecimal::from_str("30.00").unwrap(),
            BigDecimal::from_str("45.00").unwrap(),
        )
        .await
        .unwrap()
        .expect("submission should succeed");

    outcome.timesheet.id
}

#[sqlx::test(migrations = "./migrations")]
async fn approval_settles_the_week_into_an_invoice(pool: PgPool) {
    let timesheet_id = claimed_and_submitted(&pool, Some("cus_test_1")).await;
    let approver = seed_staff(&pool, "staff@example.com").await;
    let billing = RecordingBilling::default();
    let settlement = settlement_with(&pool, billing.clone());

    let (timesheet, invoice) = settlement
        .approve_timesheet(timesheet_id, &approver, &percentage_fee("5.00"))
        .await
        .expect("approval should succeed");

    // 7.5h x $30 = 22500 cents, 5% fee = 1125, total 23625
    assert_eq!(timesheet.status, TimesheetStatus::Approved);
    assert_eq!(billing.totals.lock().unwrap().as_slice(), &[23_625]);
    assert_eq!(invoice.total, BigDecimal::from_str("236.25").unwrap());
    assert_eq!(invoice.subtotal, BigDecimal::from_str("225.00").unwrap());
    assert_eq!(invoice.amount_due, BigDecimal::from_str("236.25").unwrap());
    assert_eq!(invoice.timesheet_id, Some(timesheet_id));
    assert!(invoice.external_invoice_id.is_some());
    assert!(invoice.invoice_number.starts_with("INV-"));
}

#[sqlx::test(migrations = "./migrations")]
async fn provider_failure_rolls_the_timesheet_back_to_pending(pool: PgPool) {
    let timesheet_id = claimed_and_submitted(&pool, Some("cus_test_1")).await;
    let approver = seed_staff(&pool, "staff@example.com").await;
    let settlement = settlement_with(&pool, FailingBilling);

    let result = settlement
        .approve_timesheet(timesheet_id, &approver, &percentage_fee("5.00"))
        .await;
    assert!(matches!(result, Err(AppError::ExternalProviderError(_))));

    // Never left APPROVED without an invoice
    let timesheet = TimesheetRepository::new(pool.clone())
        .find_by_id(timesheet_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(timesheet.status, TimesheetStatus::Pending);

    let invoice = InvoiceRepository::new(pool.clone())
        .find_by_timesheet(timesheet_id)
        .await
        .unwrap();
    assert!(invoice.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn second_approval_reuses_the_invoice(pool: PgPool) {
    let timesheet_id = claimed_and_submitted(&pool, Some("cus_test_1")).await;
    let approver = seed_staff(&pool, "staff@example.com").await;
    let billing = RecordingBilling::default();
    let settlement = settlement_with(&pool, billing.clone());
    let fee = percentage_fee("5.00");

    let (_, first_invoice) = settlement
        .approve_timesheet(timesheet_id, &approver, &fee)
        .await
        .unwrap();
    let (timesheet, second_invoice) = settlement
        .approve_timesheet(timesheet_id, &approver, &fee)
        .await
        .unwrap();

    assert_eq!(first_invoice.id, second_invoice.id);
    assert_eq!(timesheet.status, TimesheetStatus::Approved);
    assert_eq!(billing.calls.load(Ordering::SeqCst), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn missing_billing_customer_blocks_approval_without_mutation(pool: PgPool) {
    let timesheet_id = claimed_and_submitted(&pool, None).await;
    let approver = seed_staff(&pool, "staff@example.com").await;
    let billing = RecordingBilling::default();
    let settlement = settlement_with(&pool, billing.clone());

    let result = settlement
        .approve_timesheet(timesheet_id, &approver, &percentage_fee("5.00"))
        .await;
    assert!(matches!(result, Err(AppError::BillingNotConfigured(_))));

    let timesheet = TimesheetRepository::new(pool.clone())
        .find_by_id(timesheet_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(timesheet.status, TimesheetStatus::Pending);
    assert_eq!(billing.calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn reject_and_void_are_guarded_transitions(pool: PgPool) {
    let timesheet_id = claimed_and_submitted(&pool, Some("cus_test_1")).await;
    let approver = seed_staff(&pool, "staff@example.com").await;
    let settlement = settlement_with(&pool, RecordingBilling::default());

    let rejected = settlement
        .reject_timesheet(timesheet_id, &approver)
        .await
        .unwrap();
    assert_eq!(rejected.status, TimesheetStatus::Rejected);

    // A rejected timesheet cannot be voided
    let result = settlement.void_timesheet(timesheet_id, &approver).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn voiding_an_invoiced_timesheet_keeps_the_invoice(pool: PgPool) {
    let timesheet_id = claimed_and_submitted(&pool, Some("cus_test_1")).await;
    let approver = seed_staff(&pool, "staff@example.com").await;
    let settlement = settlement_with(&pool, RecordingBilling::default());
    let fee = percentage_fee("5.00");

    settlement
        .approve_timesheet(timesheet_id, &approver, &fee)
        .await
        .unwrap();

    let voided = settlement
        .void_timesheet(timesheet_id, &approver)
        .await
        .unwrap();
    assert_eq!(voided.status, TimesheetStatus::Void);

    let invoice = InvoiceRepository::new(pool.clone())
        .find_by_timesheet(timesheet_id)
        .await
        .unwrap();
    assert!(invoice.is_some());
}
