use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{Action, EntityType, RecurrenceDayStatus, RequisitionStatus};
use crate::database::repositories::{RecurrenceDayRepository, RequisitionRepository};
use crate::error::AppError;
use crate::services::audit::AuditLogger;

/// A temp requisition whose latest shift is this many days past gets closed
/// out by the daily batch.
pub const OUTDATED_AFTER_DAYS: i64 = 7;

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingSummary {
    pub examined: usize,
    pub canceled: usize,
    pub unfulfilled: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct AgingService {
    requisition_repository: RequisitionRepository,
    recurrence_day_repository: RecurrenceDayRepository,
    audit_logger: AuditLogger,
}

impl AgingService {
    pub fn new(
        requisition_repository: RequisitionRepository,
        recurrence_day_repository: RecurrenceDayRepository,
        audit_logger: AuditLogger,
    ) -> Self {
        Self {
            requisition_repository,
            recurrence_day_repository,
            audit_logger,
        }
    }

    /// Daily reconciliation over every non-archived, non-permanent OPEN
    /// requisition, judged against one observation instant. A requisition
    /// whose newest shift is more than a week past becomes CANCELED when no
    /// shift was ever filled, UNFULFILLED otherwise. One bad row never
    /// aborts the batch.
    pub async fn close_outdated_requisitions(&self) -> Result<AgingSummary, AppError> {
        let observed_at = Utc::now();
        let cutoff = observed_at.date_naive() - Duration::days(OUTDATED_AFTER_DAYS);

        let snapshots = self.requisition_repository.aging_snapshots().await?;
        let mut summary = AgingSummary::default();

        for snapshot in snapshots {
            summary.examined += 1;

            let Some(latest_date) = snapshot.latest_date else {
                continue;
            };
            if latest_date >= cutoff {
                continue;
            }

            let target = if snapshot.filled_days == 0 {
                RequisitionStatus::Canceled
            } else {
                RequisitionStatus::Unfulfilled
            };

            match self
                .retire(snapshot.requisition_id, target.clone(), observed_at)
                .await
            {
                Ok(()) => match target {
                    RequisitionStatus::Canceled => summary.canceled += 1,
                    _ => summary.unfulfilled += 1,
                },
                Err(e) => {
                    log::error!(
                        "Aging batch failed on requisition {}: {}; continuing",
                        snapshot.requisition_id,
                        e
                    );
                    summary.errors += 1;
                }
            }
        }

        log::info!(
            "Aging batch: {} examined, {} canceled, {} unfulfilled, {} errors",
            summary.examined,
            summary.canceled,
            summary.unfulfilled,
            summary.errors
        );

        Ok(summary)
    }

    async fn retire(
        &self,
        requisition_id: Uuid,
        target: RequisitionStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let updated = self
            .requisition_repository
            .update_status(requisition_id, target.clone())
            .await?;
        if updated.is_none() {
            return Err(AppError::NotFound(format!(
                "requisition {} disappeared mid-batch",
                requisition_id
            )));
        }

        let day_status = match target {
            RequisitionStatus::Canceled => RecurrenceDayStatus::Canceled,
            _ => RecurrenceDayStatus::Unfulfilled,
        };
        self.recurrence_day_repository
            .close_open_days(requisition_id, day_status, observed_at)
            .await?;

        if let Err(e) = self
            .audit_logger
            .log(
                None,
                EntityType::REQUISITION,
                requisition_id,
                Action::OUTDATED,
                format!("Requisition closed by aging batch as {}", target),
                None,
            )
            .await
        {
            log::warn!("Failed to log aging transition: {}", e);
        }

        Ok(())
    }
}
