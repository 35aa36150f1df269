use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::database::models::{Action, EntityType};
use crate::database::repositories::WorkdayRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::audit::{metadata, AuditLogger};
use crate::services::{ClaimService, UserContextService};

/// Candidate claims an open shift. Conflicts surface to the caller as
/// "this shift was just taken".
pub async fn claim_shift(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    claim_service: web::Data<ClaimService>,
    audit_logger: web::Data<AuditLogger>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_candidate()?;

    let recurrence_day_id = path.into_inner();
    let outcome = claim_service.claim_shift(&context, recurrence_day_id).await?;

    log::info!(
        "Candidate {} claimed shift {} (workday {})",
        context.user_id(),
        recurrence_day_id,
        outcome.workday.id
    );

    if let Err(e) = audit_logger
        .log(
            Some(context.user_id()),
            EntityType::WORKDAY,
            outcome.workday.id,
            Action::CLAIMED,
            format!("Shift on {} claimed", outcome.recurrence_day.date),
            Some(metadata(vec![
                ("recurrenceDayId", recurrence_day_id.to_string()),
                ("timesheetId", outcome.timesheet.id.to_string()),
            ])),
        )
        .await
    {
        log::warn!("Failed to log claim: {}", e);
    }

    Ok(ApiResponse::created(outcome))
}

pub async fn cancel_shift(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    claim_service: web::Data<ClaimService>,
    audit_logger: web::Data<AuditLogger>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;

    let workday_id = path.into_inner();
    let workday = claim_service.cancel_shift(&context, workday_id).await?;

    if let Err(e) = audit_logger
        .log(
            Some(context.user_id()),
            EntityType::WORKDAY,
            workday.id,
            Action::CANCELED,
            "Workday canceled".to_string(),
            None,
        )
        .await
    {
        log::warn!("Failed to log cancellation: {}", e);
    }

    Ok(ApiResponse::success(workday))
}

pub async fn get_my_workdays(
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    workday_repo: web::Data<WorkdayRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;

    let workdays = workday_repo.get_by_candidate(context.user_id()).await?;

    Ok(ApiResponse::success(workdays))
}
