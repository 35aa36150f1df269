use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{
    Action, AdminFeeConfig, Client, EntityType, FeeType, Invoice, InvoiceInput, InvoiceSourceType,
    InvoiceStatus, Requisition, Timesheet, TimesheetStatus,
};
use crate::database::repositories::{
    ClientRepository, InvoiceRepository, RequisitionRepository, TimesheetRepository,
};
use crate::error::{is_unique_violation, AppError};
use crate::services::audit::{metadata, AuditLogger};
use crate::services::billing::{BillingProvider, ExternalLineItem};
use crate::services::time_conversion::round2;
use crate::services::user_context::UserContext;

/// Hours beyond this per-week threshold bill at the overtime rate.
pub const STANDARD_WEEK_HOURS: f64 = 40.0;

/// The money side of one approval, all in integer cents.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementAmounts {
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub regular_cents: i64,
    pub overtime_cents: i64,
    pub subtotal_cents: i64,
    pub fee_cents: i64,
    pub total_cents: i64,
}

/// NUMERIC(…,2) to integer cents, half-up.
pub fn decimal_to_cents(value: &BigDecimal) -> Result<i64, AppError> {
    (value * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| {
            AppError::internal_server_error_message(format!("amount out of range: {}", value))
        })
}

/// Integer cents back to a NUMERIC(…,2) value for storage.
pub fn cents_to_decimal(cents: i64) -> BigDecimal {
    BigDecimal::new(cents.into(), 2)
}

fn hours_to_centihours(hours: f64) -> i64 {
    (hours * 100.0).round() as i64
}

/// hours x rate in cents, half-up, no floating point in the money path.
fn amount_cents(hours: f64, rate_cents: i64) -> i64 {
    (hours_to_centihours(hours) * rate_cents + 50) / 100
}

/// Regular/overtime split plus platform fee for one approved week. Pure;
/// the fee config arrives as a parameter, never from process state.
pub fn compute_settlement(
    total_hours: f64,
    rate_base: &BigDecimal,
    rate_ot: &BigDecimal,
    fee_config: &AdminFeeConfig,
) -> Result<SettlementAmounts, AppError> {
    if total_hours < 0.0 {
        return Err(AppError::Validation(format!(
            "negative hours cannot be billed: {}",
            total_hours
        )));
    }

    let regular_hours = round2(total_hours.min(STANDARD_WEEK_HOURS));
    let overtime_hours = round2((total_hours - STANDARD_WEEK_HOURS).max(0.0));

    let regular_cents = amount_cents(regular_hours, decimal_to_cents(rate_base)?);
    let overtime_cents = amount_cents(overtime_hours, decimal_to_cents(rate_ot)?);
    let subtotal_cents = regular_cents + overtime_cents;

    let fee_cents = match fee_config.fee_type {
        FeeType::Percentage => {
            // fee_amount is a percent; decimal_to_cents turns 5.00 into 500
            // basis points, so divide by 10_000 with half-up rounding.
            let basis_points = decimal_to_cents(&fee_config.fee_amount)?;
            (subtotal_cents * basis_points + 5_000) / 10_000
        }
        FeeType::Fixed => decimal_to_cents(&fee_config.fee_amount)?,
    };

    Ok(SettlementAmounts {
        regular_hours,
        overtime_hours,
        regular_cents,
        overtime_cents,
        subtotal_cents,
        fee_cents,
        total_cents: subtotal_cents + fee_cents,
    })
}

#[derive(Clone)]
pub struct SettlementService<B: BillingProvider> {
    timesheet_repository: TimesheetRepository,
    invoice_repository: InvoiceRepository,
    requisition_repository: RequisitionRepository,
    client_repository: ClientRepository,
    audit_logger: AuditLogger,
    billing: B,
}

impl<B: BillingProvider> SettlementService<B> {
    pub fn new(
        timesheet_repository: TimesheetRepository,
        invoice_repository: InvoiceRepository,
        requisition_repository: RequisitionRepository,
        client_repository: ClientRepository,
        audit_logger: AuditLogger,
        billing: B,
    ) -> Self {
        Self {
            timesheet_repository,
            invoice_repository,
            requisition_repository,
            client_repository,
            audit_logger,
            billing,
        }
    }

    /// Approve a pending timesheet and turn it into a hosted invoice.
    ///
    /// The provider call cannot join the local transaction, so the sequence
    /// is an explicit saga: transition first, then invoice; any failure
    /// after the transition reverts the timesheet to PENDING before the
    /// error surfaces. An APPROVED timesheet without an invoice never
    /// persists.
    pub async fn approve_timesheet(
        &self,
        timesheet_id: Uuid,
        approver: &UserContext,
        fee_config: &AdminFeeConfig,
    ) -> Result<(Timesheet, Invoice), AppError> {
        let timesheet = self
            .timesheet_repository
            .find_by_id(timesheet_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Timesheet not found".to_string()))?;

        // Re-approval with an existing invoice is a no-op, not a duplicate.
        if let Some(existing) = self
            .invoice_repository
            .find_by_timesheet(timesheet_id)
            .await?
        {
            return Ok((timesheet, existing));
        }

        if timesheet.status != TimesheetStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Only pending timesheets can be approved (current: {})",
                timesheet.status
            )));
        }

        let requisition = self
            .requisition_repository
            .find_by_id(timesheet.requisition_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

        let client = self
            .client_repository
            .find_by_id(requisition.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

        // Precondition check before any mutation: no billing handle, no
        // approval.
        let customer_handle = client.billing_customer_id.clone().ok_or_else(|| {
            AppError::BillingNotConfigured(format!(
                "Client {} has no billing customer",
                client.name
            ))
        })?;

        // The handle must also resolve to a live customer at the provider.
        let customer = self.billing.retrieve_customer(&customer_handle).await?;
        if customer.deleted {
            return Err(AppError::BillingNotConfigured(format!(
                "Billing customer {} was deleted at the provider",
                customer_handle
            )));
        }

        let rate_base = timesheet.candidate_rate_base.clone().ok_or_else(|| {
            AppError::Validation("Timesheet has no base rate".to_string())
        })?;
        let rate_ot = timesheet.candidate_rate_ot.clone().ok_or_else(|| {
            AppError::Validation("Timesheet has no overtime rate".to_string())
        })?;

        let approved = self
            .timesheet_repository
            .update_status_guarded(timesheet_id, TimesheetStatus::Pending, TimesheetStatus::Approved)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Timesheet left pending before approval completed".to_string())
            })?;

        if let Err(e) = self
            .audit_logger
            .log_transition(
                Some(approver.user_id()),
                EntityType::TIMESHEET,
                timesheet_id,
                Action::APPROVED,
                "Timesheet approved".to_string(),
                TimesheetStatus::Pending.to_string(),
                TimesheetStatus::Approved.to_string(),
            )
            .await
        {
            log::warn!("Failed to log timesheet approval: {}", e);
        }

        match self
            .settle(&approved, &requisition, &client, &customer_handle, &rate_base, &rate_ot, fee_config)
            .await
        {
            Ok(invoice) => Ok((approved, invoice)),
            Err(err) => {
                // Compensating rollback; without it the timesheet would sit
                // APPROVED with no invoice.
                match self.timesheet_repository.revert_to_pending(timesheet_id).await {
                    Ok(Some(_)) => {
                        if let Err(audit_err) = self
                            .audit_logger
                            .log_transition(
                                Some(approver.user_id()),
                                EntityType::TIMESHEET,
                                timesheet_id,
                                Action::REVERTED,
                                format!("Approval rolled back: {}", err),
                                TimesheetStatus::Approved.to_string(),
                                TimesheetStatus::Pending.to_string(),
                            )
                            .await
                        {
                            log::warn!("Failed to log approval rollback: {}", audit_err);
                        }
                    }
                    Ok(None) => {
                        log::error!(
                            "Timesheet {} was not in APPROVED during rollback; state needs review",
                            timesheet_id
                        );
                    }
                    Err(revert_err) => {
                        log::error!(
                            "CRITICAL: failed to revert timesheet {} after settlement error (settle: {}, revert: {})",
                            timesheet_id,
                            err,
                            revert_err
                        );
                    }
                }
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle(
        &self,
        timesheet: &Timesheet,
        requisition: &Requisition,
        client: &Client,
        customer_handle: &str,
        rate_base: &BigDecimal,
        rate_ot: &BigDecimal,
        fee_config: &AdminFeeConfig,
    ) -> Result<Invoice, AppError> {
        let total_hours = timesheet.total_hours_worked.to_f64().ok_or_else(|| {
            AppError::internal_server_error_message("unreadable total hours")
        })?;

        let amounts = compute_settlement(total_hours, rate_base, rate_ot, fee_config)?;

        let mut line_items = vec![ExternalLineItem {
            amount_cents: amounts.regular_cents,
            description: format!(
                "{}: {} regular hours, week of {}",
                requisition.title, amounts.regular_hours, timesheet.week_begin_date
            ),
            quantity: amounts.regular_hours,
        }];
        if amounts.overtime_hours > 0.0 {
            line_items.push(ExternalLineItem {
                amount_cents: amounts.overtime_cents,
                description: format!(
                    "{}: {} overtime hours, week of {}",
                    requisition.title, amounts.overtime_hours, timesheet.week_begin_date
                ),
                quantity: amounts.overtime_hours,
            });
        }
        if amounts.fee_cents > 0 {
            line_items.push(ExternalLineItem {
                amount_cents: amounts.fee_cents,
                description: "Platform service fee".to_string(),
                quantity: 1.0,
            });
        }

        let mut provider_metadata = HashMap::new();
        provider_metadata.insert("timesheetId".to_string(), timesheet.id.to_string());
        provider_metadata.insert("requisitionId".to_string(), requisition.id.to_string());
        provider_metadata.insert("candidateId".to_string(), timesheet.candidate_id.to_string());

        let external = self
            .billing
            .create_invoice(customer_handle, &line_items, &provider_metadata, None)
            .await?;

        let input = InvoiceInput {
            status: InvoiceStatus::Open,
            source_type: InvoiceSourceType::Timesheet,
            amount_due: cents_to_decimal(amounts.total_cents),
            subtotal: cents_to_decimal(amounts.subtotal_cents),
            total: cents_to_decimal(amounts.total_cents),
            tax_amount: cents_to_decimal(0),
            client_id: client.id,
            candidate_id: Some(timesheet.candidate_id),
            requisition_id: Some(requisition.id),
            timesheet_id: Some(timesheet.id),
            external_invoice_id: Some(external.external_id.clone()),
            hosted_invoice_url: external.hosted_url.clone(),
            pdf_url: external.pdf_url.clone(),
        };

        let invoice = match self.invoice_repository.create_invoice(input).await {
            Ok(invoice) => invoice,
            Err(e) if is_unique_violation(&e) => {
                // A concurrent approval won the insert; its invoice stands.
                log::warn!(
                    "Invoice for timesheet {} already recorded; external invoice {} is orphaned",
                    timesheet.id,
                    external.external_id
                );
                self.invoice_repository
                    .find_by_timesheet(timesheet.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal_server_error_message("invoice vanished after conflict")
                    })?
            }
            Err(e) => return Err(AppError::DatabaseError(e)),
        };

        if let Err(e) = self
            .timesheet_repository
            .set_total_hours_billed(
                timesheet.id,
                cents_to_decimal(hours_to_centihours(total_hours)),
            )
            .await
        {
            log::warn!(
                "Failed to record billed hours on timesheet {}: {}",
                timesheet.id,
                e
            );
        }

        if let Err(e) = self
            .audit_logger
            .log(
                None,
                EntityType::INVOICE,
                invoice.id,
                Action::CREATED,
                format!(
                    "Invoice {} created for timesheet {}",
                    invoice.invoice_number, timesheet.id
                ),
                Some(metadata(vec![
                    ("totalCents", amounts.total_cents.to_string()),
                    ("feeCents", amounts.fee_cents.to_string()),
                    ("externalInvoiceId", external.external_id.clone()),
                ])),
            )
            .await
        {
            log::warn!("Failed to log invoice creation: {}", e);
        }

        Ok(invoice)
    }

    pub async fn reject_timesheet(
        &self,
        timesheet_id: Uuid,
        approver: &UserContext,
    ) -> Result<Timesheet, AppError> {
        let rejected = self
            .timesheet_repository
            .update_status_guarded(timesheet_id, TimesheetStatus::Pending, TimesheetStatus::Rejected)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Only pending timesheets can be rejected".to_string())
            })?;

        if let Err(e) = self
            .audit_logger
            .log_transition(
                Some(approver.user_id()),
                EntityType::TIMESHEET,
                timesheet_id,
                Action::REJECTED,
                "Timesheet rejected".to_string(),
                TimesheetStatus::Pending.to_string(),
                TimesheetStatus::Rejected.to_string(),
            )
            .await
        {
            log::warn!("Failed to log timesheet rejection: {}", e);
        }

        Ok(rejected)
    }

    /// Void from PENDING or APPROVED. Voiding an invoiced timesheet leaves
    /// the invoice alone; retracting it at the provider is a separate,
    /// explicit operation.
    pub async fn void_timesheet(
        &self,
        timesheet_id: Uuid,
        approver: &UserContext,
    ) -> Result<Timesheet, AppError> {
        let mut previous = TimesheetStatus::Pending;
        let mut voided = self
            .timesheet_repository
            .update_status_guarded(timesheet_id, TimesheetStatus::Pending, TimesheetStatus::Void)
            .await?;

        if voided.is_none() {
            previous = TimesheetStatus::Approved;
            voided = self
                .timesheet_repository
                .update_status_guarded(timesheet_id, TimesheetStatus::Approved, TimesheetStatus::Void)
                .await?;
        }

        let voided = voided.ok_or_else(|| {
            AppError::Conflict("Only pending or approved timesheets can be voided".to_string())
        })?;

        if let Err(e) = self
            .audit_logger
            .log_transition(
                Some(approver.user_id()),
                EntityType::TIMESHEET,
                timesheet_id,
                Action::VOIDED,
                "Timesheet voided".to_string(),
                previous.to_string(),
                TimesheetStatus::Void.to_string(),
            )
            .await
        {
            log::warn!("Failed to log timesheet void: {}", e);
        }

        Ok(voided)
    }

    /// Reviewer explicitly records that the week did not reconcile.
    /// DISCREPANCY is otherwise advisory metadata from validation, never a
    /// persisted status.
    pub async fn mark_timesheet_discrepancy(
        &self,
        timesheet_id: Uuid,
        approver: &UserContext,
    ) -> Result<Timesheet, AppError> {
        let marked = self
            .timesheet_repository
            .update_status_guarded(
                timesheet_id,
                TimesheetStatus::Pending,
                TimesheetStatus::Discrepancy,
            )
            .await?
            .ok_or_else(|| {
                AppError::Conflict(
                    "Only pending timesheets can be marked as discrepant".to_string(),
                )
            })?;

        if let Err(e) = self
            .audit_logger
            .log_transition(
                Some(approver.user_id()),
                EntityType::TIMESHEET,
                timesheet_id,
                Action::UPDATED,
                "Timesheet marked as discrepant".to_string(),
                TimesheetStatus::Pending.to_string(),
                TimesheetStatus::Discrepancy.to_string(),
            )
            .await
        {
            log::warn!("Failed to log discrepancy mark: {}", e);
        }

        Ok(marked)
    }

    /// Admin-facing face of the rollback primitive.
    pub async fn revert_timesheet_to_pending(
        &self,
        timesheet_id: Uuid,
        approver: &UserContext,
    ) -> Result<Timesheet, AppError> {
        let reverted = self
            .timesheet_repository
            .revert_to_pending(timesheet_id)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Only approved timesheets can be reverted".to_string())
            })?;

        if let Err(e) = self
            .audit_logger
            .log_transition(
                Some(approver.user_id()),
                EntityType::TIMESHEET,
                timesheet_id,
                Action::REVERTED,
                "Timesheet reverted to pending".to_string(),
                TimesheetStatus::Approved.to_string(),
                TimesheetStatus::Pending.to_string(),
            )
            .await
        {
            log::warn!("Failed to log timesheet revert: {}", e);
        }

        Ok(reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn fee(amount: &str, fee_type: FeeType) -> AdminFeeConfig {
        AdminFeeConfig {
            id: Uuid::new_v4(),
            fee_amount: BigDecimal::from_str(amount).unwrap(),
            fee_type,
            updated_at: Utc::now(),
        }
    }

    fn rate(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn plain_week_with_percentage_fee() {
        // 7.5h at $30/h plus a 5% platform fee
        let amounts = compute_settlement(
            7.5,
            &rate("30.00"),
            &rate("45.00"),
            &fee("5.00", FeeType::Percentage),
        )
        .unwrap();

        assert_eq!(amounts.regular_hours, 7.5);
        assert_eq!(amounts.overtime_hours, 0.0);
        assert_eq!(amounts.subtotal_cents, 22_500);
        assert_eq!(amounts.fee_cents, 1_125);
        assert_eq!(amounts.total_cents, 23_625);
    }

    #[test]
    fn overtime_splits_at_the_weekly_threshold() {
        let amounts = compute_settlement(
            45.0,
            &rate("30.00"),
            &rate("45.00"),
            &fee("25.00", FeeType::Fixed),
        )
        .unwrap();

        assert_eq!(amounts.regular_hours, 40.0);
        assert_eq!(amounts.overtime_hours, 5.0);
        assert_eq!(amounts.regular_cents, 120_000);
        assert_eq!(amounts.overtime_cents, 22_500);
        assert_eq!(amounts.fee_cents, 2_500);
        assert_eq!(amounts.total_cents, 145_000);
    }

    #[test]
    fn fractional_hours_stay_in_integer_cents() {
        let amounts = compute_settlement(
            7.33,
            &rate("30.00"),
            &rate("45.00"),
            &fee("0", FeeType::Percentage),
        )
        .unwrap();

        assert_eq!(amounts.subtotal_cents, 21_990);
        assert_eq!(amounts.fee_cents, 0);
    }

    #[test]
    fn percentage_fee_rounds_half_up() {
        // $0.30 subtotal at 5% is 1.5 cents; half-up lands on 2
        let amounts = compute_settlement(
            0.01,
            &rate("30.00"),
            &rate("45.00"),
            &fee("5.00", FeeType::Percentage),
        )
        .unwrap();

        assert_eq!(amounts.subtotal_cents, 30);
        assert_eq!(amounts.fee_cents, 2);
    }

    #[test]
    fn negative_hours_are_rejected() {
        let result = compute_settlement(
            -1.0,
            &rate("30.00"),
            &rate("45.00"),
            &fee("5.00", FeeType::Percentage),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn cents_round_trip_through_decimal_storage() {
        assert_eq!(cents_to_decimal(23_625).to_string(), "236.25");
        assert_eq!(decimal_to_cents(&rate("236.25")).unwrap(), 23_625);
        assert_eq!(decimal_to_cents(&rate("30")).unwrap(), 3_000);
    }
}
