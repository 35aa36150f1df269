use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::RecurrenceDayInput;
use crate::database::repositories::{NewRecurrenceDay, RecurrenceDayRepository, WorkdayRepository};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::time_conversion::local_to_utc;
use crate::services::{ClaimService, UserContextService};

#[derive(Debug, Deserialize)]
pub struct MutateDayQuery {
    pub force: Option<bool>,
}

/// Convert one client-authored shift to UTC and check its window
/// invariants: the day must have positive length and the lunch window must
/// sit strictly inside it.
pub fn build_day(input: &RecurrenceDayInput, zone: &str) -> Result<NewRecurrenceDay, AppError> {
    let day_start = local_to_utc(input.date, &input.day_start, zone)?;
    let day_end = local_to_utc(input.date, &input.day_end, zone)?;

    if day_end <= day_start {
        return Err(AppError::Validation(format!(
            "Shift on {} ends before it starts",
            input.date
        )));
    }

    let (lunch_start, lunch_end) = match (&input.lunch_start, &input.lunch_end) {
        (Some(start), Some(end)) => {
            let lunch_start = local_to_utc(input.date, start, zone)?;
            let lunch_end = local_to_utc(input.date, end, zone)?;
            if !(day_start < lunch_start && lunch_start <= lunch_end && lunch_end < day_end) {
                return Err(AppError::Validation(format!(
                    "Lunch window on {} falls outside the shift",
                    input.date
                )));
            }
            (Some(lunch_start), Some(lunch_end))
        }
        (None, None) => (None, None),
        _ => {
            return Err(AppError::Validation(format!(
                "Shift on {} has only one lunch boundary",
                input.date
            )));
        }
    };

    Ok(NewRecurrenceDay {
        date: input.date,
        day_start,
        day_end,
        lunch_start,
        lunch_end,
    })
}

/// Edit a single shift. Refused once claimed unless `force=true`, which
/// cancels the claim first (dropping the workday and any DRAFT-only
/// timesheet, never a submitted one).
pub async fn update_recurrence_day(
    path: web::Path<Uuid>,
    input: web::Json<RecurrenceDayInput>,
    query: web::Query<MutateDayQuery>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    day_repo: web::Data<RecurrenceDayRepository>,
    workday_repo: web::Data<WorkdayRepository>,
    claim_service: web::Data<ClaimService>,
    requisition_repo: web::Data<crate::database::repositories::RequisitionRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let day_id = path.into_inner();
    let day = day_repo
        .find_by_id(day_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    release_claim_if_forced(
        &context,
        day_id,
        query.force.unwrap_or(false),
        &workday_repo,
        &claim_service,
    )
    .await?;

    let requisition = requisition_repo
        .find_by_id(day.requisition_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    let new_day = build_day(&input, &requisition.reference_timezone)?;
    let updated = day_repo
        .update_day(day_id, new_day)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    Ok(ApiResponse::success(updated))
}

pub async fn delete_recurrence_day(
    path: web::Path<Uuid>,
    query: web::Query<MutateDayQuery>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    day_repo: web::Data<RecurrenceDayRepository>,
    workday_repo: web::Data<WorkdayRepository>,
    claim_service: web::Data<ClaimService>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let day_id = path.into_inner();

    release_claim_if_forced(
        &context,
        day_id,
        query.force.unwrap_or(false),
        &workday_repo,
        &claim_service,
    )
    .await?;

    let deleted = day_repo.delete_day(day_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Shift not found".to_string()));
    }

    Ok(ApiResponse::success_message("Shift deleted"))
}

async fn release_claim_if_forced(
    context: &crate::services::UserContext,
    day_id: Uuid,
    force: bool,
    workday_repo: &WorkdayRepository,
    claim_service: &ClaimService,
) -> Result<(), AppError> {
    let Some(workday) = workday_repo.find_by_recurrence_day(day_id).await? else {
        return Ok(());
    };

    if !force {
        return Err(AppError::Conflict(
            "Shift already has an occupant; pass force=true to cancel the claim".to_string(),
        ));
    }

    claim_service.cancel_shift(context, workday.id).await?;
    Ok(())
}
