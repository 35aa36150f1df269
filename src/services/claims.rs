use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    RecurrenceDay, RecurrenceDayStatus, Requisition, RequisitionStatus, Timesheet, Workday,
};
use crate::database::repositories::{
    ClientRepository, RecurrenceDayRepository, RequisitionRepository, TimesheetRepository,
    WorkdayRepository,
};
use crate::database::transaction::DatabaseTransaction;
use crate::error::{is_unique_violation, AppError};
use crate::services::notification::Notifier;
use crate::services::time_conversion::week_begin;
use crate::services::user_context::UserContext;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub workday: Workday,
    pub timesheet: Timesheet,
    pub recurrence_day: RecurrenceDay,
    #[serde(skip)]
    pub requisition: Requisition,
}

#[derive(Clone)]
pub struct ClaimService {
    pool: PgPool,
    client_repository: ClientRepository,
    notifier: Notifier,
}

impl ClaimService {
    pub fn new(pool: PgPool, client_repository: ClientRepository, notifier: Notifier) -> Self {
        Self {
            pool,
            client_repository,
            notifier,
        }
    }

    /// Bind the candidate to an open shift. Steps share one transaction;
    /// exclusivity rests on the workday unique index, so concurrent claims
    /// resolve to exactly one winner and `AlreadyClaimed` for the rest.
    pub async fn claim_shift(
        &self,
        candidate: &UserContext,
        recurrence_day_id: Uuid,
    ) -> Result<ClaimOutcome, AppError> {
        let candidate_id = candidate.user_id();
        let disciplines = candidate.disciplines.clone();

        let outcome = DatabaseTransaction::run(&self.pool, |tx| {
            Box::pin(async move {
                let day = RecurrenceDayRepository::find_by_id_in_tx(tx, recurrence_day_id)
                    .await?
                    .filter(|d| !d.archived)
                    .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

                let requisition = RequisitionRepository::find_by_id_in_tx(tx, day.requisition_id)
                    .await?
                    .filter(|r| !r.archived)
                    .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

                if requisition.status != RequisitionStatus::Open {
                    return Err(AppError::NotFound(
                        "Requisition is not open for claiming".to_string(),
                    ));
                }

                if !disciplines
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(&requisition.discipline))
                {
                    return Err(AppError::Forbidden(format!(
                        "Candidate has no declared experience in {}",
                        requisition.discipline
                    )));
                }

                match day.status {
                    RecurrenceDayStatus::Open => {}
                    RecurrenceDayStatus::Filled => return Err(AppError::AlreadyClaimed),
                    _ => {
                        return Err(AppError::Conflict(
                            "Shift is no longer open for claiming".to_string(),
                        ));
                    }
                }

                let workday = WorkdayRepository::insert_in_tx(
                    tx,
                    requisition.id,
                    day.id,
                    candidate_id,
                )
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::AlreadyClaimed
                    } else {
                        AppError::DatabaseError(e)
                    }
                })?;

                let timesheet = TimesheetRepository::find_or_create_draft_in_tx(
                    tx,
                    candidate_id,
                    requisition.id,
                    week_begin(day.date),
                )
                .await?;

                let workday = WorkdayRepository::set_timesheet_in_tx(tx, workday.id, timesheet.id)
                    .await?
                    .unwrap_or(workday);

                let recurrence_day = RecurrenceDayRepository::update_status_in_tx(
                    tx,
                    day.id,
                    RecurrenceDayStatus::Open,
                    RecurrenceDayStatus::Filled,
                )
                .await?
                .ok_or(AppError::AlreadyClaimed)?;

                // Last open day of a temp requisition fills the requisition.
                if !requisition.permanent_position
                    && RecurrenceDayRepository::count_open_in_tx(tx, requisition.id).await? == 0
                {
                    RequisitionRepository::update_status_in_tx(
                        tx,
                        requisition.id,
                        RequisitionStatus::Open,
                        RequisitionStatus::Filled,
                    )
                    .await?;
                }

                Ok(ClaimOutcome {
                    workday,
                    timesheet,
                    recurrence_day,
                    requisition,
                })
            })
        })
        .await?;

        // The claim stands whether or not anyone hears about it.
        if let Err(e) = self.notify_claimed(&outcome).await {
            log::warn!(
                "Failed to notify client about claim on shift {}: {}",
                recurrence_day_id,
                e
            );
        }

        Ok(outcome)
    }

    async fn notify_claimed(&self, outcome: &ClaimOutcome) -> anyhow::Result<()> {
        let client = self
            .client_repository
            .find_by_id(outcome.requisition.client_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("client not found"))?;

        self.notifier
            .notify(
                "shift_claimed",
                &client.contact_email,
                serde_json::json!({
                    "requisitionTitle": outcome.requisition.title,
                    "date": outcome.recurrence_day.date,
                    "candidateId": outcome.workday.candidate_id,
                }),
            )
            .await
    }

    /// Symmetric inverse of a claim: remove the workday, drop a DRAFT-only
    /// timesheet nothing else references, reopen the shift.
    pub async fn cancel_shift(
        &self,
        caller: &UserContext,
        workday_id: Uuid,
    ) -> Result<Workday, AppError> {
        let caller_id = caller.user_id();
        let caller_is_staff = caller.is_staff_or_admin();

        DatabaseTransaction::run(&self.pool, |tx| {
            Box::pin(async move {
                let workday = WorkdayRepository::find_by_id_in_tx(tx, workday_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Workday not found".to_string()))?;

                if workday.candidate_id != caller_id && !caller_is_staff {
                    return Err(AppError::Forbidden(
                        "You do not have access to this workday".to_string(),
                    ));
                }

                let workday = WorkdayRepository::delete_in_tx(tx, workday_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Workday not found".to_string()))?;

                if let Some(timesheet_id) = workday.timesheet_id {
                    if WorkdayRepository::count_for_timesheet_in_tx(tx, timesheet_id).await? == 0 {
                        TimesheetRepository::delete_draft_in_tx(tx, timesheet_id).await?;
                    }
                }

                if let Some(day_id) = workday.recurrence_day_id {
                    RecurrenceDayRepository::update_status_in_tx(
                        tx,
                        day_id,
                        RecurrenceDayStatus::Filled,
                        RecurrenceDayStatus::Open,
                    )
                    .await?;

                    RequisitionRepository::update_status_in_tx(
                        tx,
                        workday.requisition_id,
                        RequisitionStatus::Filled,
                        RequisitionStatus::Open,
                    )
                    .await?;
                }

                Ok(workday)
            })
        })
        .await
    }
}
