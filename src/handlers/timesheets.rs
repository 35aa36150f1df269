use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::database::models::{Action, EntityType, TimesheetSubmission};
use crate::database::repositories::{
    AdminFeeRepository, RecurrenceDayRepository, RequisitionRepository, TimesheetRepository,
    WorkdayRepository,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::audit::AuditLogger;
use crate::services::billing::HostedBillingClient;
use crate::services::time_conversion::reported_wall_clock;
use crate::services::validation::{parse_hours_entries, total_reported_hours, validate_timesheet};
use crate::services::{SettlementService, UserContextService};

/// Candidate files the week's hours against a claimed workday. One
/// submission per workday-week; a second attempt conflicts.
pub async fn submit_timesheet(
    path: web::Path<Uuid>,
    input: web::Json<TimesheetSubmission>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    workday_repo: web::Data<WorkdayRepository>,
    timesheet_repo: web::Data<TimesheetRepository>,
    audit_logger: web::Data<AuditLogger>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;

    let workday_id = path.into_inner();
    let workday = workday_repo
        .find_by_id(workday_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Workday not found".to_string()))?;

    context.requires_same_user(workday.candidate_id)?;

    let timesheet_id = workday.timesheet_id.ok_or_else(|| {
        AppError::NotFound("Workday has no timesheet attached".to_string())
    })?;

    let submission = input.into_inner();
    let hours_raw = serde_json::Value::Array(submission.hours_raw.clone());

    // Entries must be readable before anything persists; bad shapes and bad
    // times reject the submission outright.
    let entries = parse_hours_entries(&hours_raw)?;
    if entries.is_empty() {
        return Err(AppError::Validation("No hour entries supplied".to_string()));
    }
    for entry in &entries {
        reported_wall_clock(&entry.start_time, "UTC")?;
        reported_wall_clock(&entry.end_time, "UTC")?;
    }
    let total_hours = total_reported_hours(&entries)?;

    let timesheet = timesheet_repo
        .submit(
            timesheet_id,
            hours_raw,
            crate::services::settlement::cents_to_decimal((total_hours * 100.0).round() as i64),
            submission.candidate_rate_base,
            submission.candidate_rate_ot,
        )
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Timesheet for this week was already submitted".to_string())
        })?;

    if let Err(e) = audit_logger
        .log(
            Some(context.user_id()),
            EntityType::TIMESHEET,
            timesheet.id,
            Action::SUBMITTED,
            format!("{} hours submitted", total_hours),
            None,
        )
        .await
    {
        log::warn!("Failed to log timesheet submission: {}", e);
    }

    Ok(ApiResponse::created(timesheet))
}

pub async fn get_timesheet(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    timesheet_repo: web::Data<TimesheetRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;

    let timesheet = timesheet_repo
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Timesheet not found".to_string()))?;

    context.requires_same_user(timesheet.candidate_id)?;

    Ok(ApiResponse::success(timesheet))
}

pub async fn get_my_timesheets(
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    timesheet_repo: web::Data<TimesheetRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;

    let timesheets = timesheet_repo.get_by_candidate(context.user_id()).await?;

    Ok(ApiResponse::success(timesheets))
}

pub async fn get_requisition_timesheets(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    timesheet_repo: web::Data<TimesheetRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let timesheets = timesheet_repo.get_by_requisition(path.into_inner()).await?;

    Ok(ApiResponse::success(timesheets))
}

/// Run reconciliation for one timesheet and return the discrepancy list.
/// Surfaced for review; an empty list also flips the advisory `validated`
/// flag on.
pub async fn validate(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    timesheet_repo: web::Data<TimesheetRepository>,
    requisition_repo: web::Data<RequisitionRepository>,
    day_repo: web::Data<RecurrenceDayRepository>,
    workday_repo: web::Data<WorkdayRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;

    let timesheet_id = path.into_inner();
    let timesheet = timesheet_repo
        .find_by_id(timesheet_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Timesheet not found".to_string()))?;

    context.requires_same_user(timesheet.candidate_id)?;

    let requisition = requisition_repo
        .find_by_id(timesheet.requisition_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    let scheduled_days = day_repo
        .get_days_in_week(requisition.id, timesheet.week_begin_date)
        .await?;
    let workdays = workday_repo
        .get_by_candidate_and_requisition(timesheet.candidate_id, requisition.id)
        .await?;

    let discrepancies = validate_timesheet(
        &timesheet,
        &scheduled_days,
        &workdays,
        &requisition.reference_timezone,
    )?;

    if let Err(e) = timesheet_repo
        .set_validated(timesheet_id, discrepancies.is_empty())
        .await
    {
        log::warn!(
            "Failed to record validation flag on timesheet {}: {}",
            timesheet_id,
            e
        );
    }

    Ok(ApiResponse::success(discrepancies))
}

pub async fn approve(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    fee_repo: web::Data<AdminFeeRepository>,
    settlement: web::Data<SettlementService<HostedBillingClient>>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    // Fee config is loaded here, per request, and handed in as a value.
    let fee_config = fee_repo.get_fee_config().await?;

    let (timesheet, invoice) = settlement
        .approve_timesheet(path.into_inner(), &context, &fee_config)
        .await?;

    Ok(ApiResponse::success(serde_json::json!({
        "timesheet": timesheet,
        "invoice": invoice,
    })))
}

pub async fn reject(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    settlement: web::Data<SettlementService<HostedBillingClient>>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let timesheet = settlement
        .reject_timesheet(path.into_inner(), &context)
        .await?;

    Ok(ApiResponse::success(timesheet))
}

pub async fn void(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    settlement: web::Data<SettlementService<HostedBillingClient>>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let timesheet = settlement
        .void_timesheet(path.into_inner(), &context)
        .await?;

    Ok(ApiResponse::success(timesheet))
}

pub async fn mark_discrepancy(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    settlement: web::Data<SettlementService<HostedBillingClient>>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let timesheet = settlement
        .mark_timesheet_discrepancy(path.into_inner(), &context)
        .await?;

    Ok(ApiResponse::success(timesheet))
}

pub async fn revert_to_pending(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    settlement: web::Data<SettlementService<HostedBillingClient>>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_admin()?;

    let timesheet = settlement
        .revert_timesheet_to_pending(path.into_inner(), &context)
        .await?;

    Ok(ApiResponse::success(timesheet))
}
