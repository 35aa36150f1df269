use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Action, EntityType, RequisitionInput, RequisitionStatus};
use crate::database::repositories::{RecurrenceDayRepository, RequisitionRepository};
use crate::error::AppError;
use crate::handlers::recurrence_days::build_day;
use crate::handlers::shared::ApiResponse;
use crate::services::audit::{metadata, AuditLogger};
use crate::services::UserContextService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionsQuery {
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RequisitionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecurrenceDaysRequest {
    pub days: Vec<crate::database::models::RecurrenceDayInput>,
}

pub async fn create_requisition(
    input: web::Json<RequisitionInput>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
    audit_logger: web::Data<AuditLogger>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let input = input.into_inner();
    if input.reference_timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(AppError::Validation(format!(
            "Unknown reference timezone: {}",
            input.reference_timezone
        )));
    }

    let requisition = requisition_repo.create_requisition(input).await.map_err(|e| {
        log::error!("Failed to create requisition: {}", e);
        AppError::from(e)
    })?;

    if let Err(e) = audit_logger
        .log(
            Some(context.user_id()),
            EntityType::REQUISITION,
            requisition.id,
            Action::CREATED,
            "Requisition created".to_string(),
            Some(metadata(vec![
                ("title", requisition.title.clone()),
                ("discipline", requisition.discipline.clone()),
            ])),
        )
        .await
    {
        log::warn!("Failed to log requisition creation: {}", e);
    }

    Ok(ApiResponse::created(requisition))
}

pub async fn get_requisitions(
    query: web::Query<RequisitionsQuery>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
) -> Result<HttpResponse, AppError> {
    context_service.extract(&req).await?;

    let requisitions = requisition_repo
        .get_requisitions(query.client_id)
        .await
        .map_err(|e| {
            log::error!("Failed to fetch requisitions: {}", e);
            AppError::from(e)
        })?;

    Ok(ApiResponse::success(requisitions))
}

pub async fn get_requisition(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
) -> Result<HttpResponse, AppError> {
    context_service.extract(&req).await?;

    let requisition_id = path.into_inner();
    let requisition = requisition_repo
        .find_by_id(requisition_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    Ok(ApiResponse::success(requisition))
}

pub async fn update_requisition(
    path: web::Path<Uuid>,
    input: web::Json<RequisitionInput>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let requisition_id = path.into_inner();
    let input = input.into_inner();
    if input.reference_timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(AppError::Validation(format!(
            "Unknown reference timezone: {}",
            input.reference_timezone
        )));
    }

    let requisition = requisition_repo
        .update_requisition(requisition_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    Ok(ApiResponse::success(requisition))
}

pub async fn update_requisition_status(
    path: web::Path<Uuid>,
    input: web::Json<UpdateStatusRequest>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
    audit_logger: web::Data<AuditLogger>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let requisition_id = path.into_inner();
    let status = input.into_inner().status;

    let requisition = requisition_repo
        .update_status(requisition_id, status.clone())
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    if let Err(e) = audit_logger
        .log(
            Some(context.user_id()),
            EntityType::REQUISITION,
            requisition_id,
            Action::UPDATED,
            format!("Requisition status set to {}", status),
            None,
        )
        .await
    {
        log::warn!("Failed to log requisition status update: {}", e);
    }

    Ok(ApiResponse::success(requisition))
}

/// Requisitions are archived, never hard-deleted.
pub async fn archive_requisition(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let requisition_id = path.into_inner();
    requisition_repo
        .set_archived(requisition_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    Ok(ApiResponse::success_message("Requisition archived"))
}

/// Bulk-create shifts for a requisition. Every local time converts through
/// the requisition's reference timezone; one bad shift rejects the batch.
pub async fn create_recurrence_days(
    path: web::Path<Uuid>,
    input: web::Json<CreateRecurrenceDaysRequest>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    requisition_repo: web::Data<RequisitionRepository>,
    day_repo: web::Data<RecurrenceDayRepository>,
    audit_logger: web::Data<AuditLogger>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let requisition_id = path.into_inner();
    let requisition = requisition_repo
        .find_by_id(requisition_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requisition not found".to_string()))?;

    let mut days = Vec::with_capacity(input.days.len());
    for day_input in &input.days {
        days.push(build_day(day_input, &requisition.reference_timezone)?);
    }
    if days.is_empty() {
        return Err(AppError::Validation("No shifts supplied".to_string()));
    }

    let created = day_repo.create_days(requisition_id, days).await.map_err(|e| {
        log::error!(
            "Failed to create recurrence days for requisition {}: {}",
            requisition_id,
            e
        );
        AppError::from(e)
    })?;

    if let Err(e) = audit_logger
        .log(
            Some(context.user_id()),
            EntityType::REQUISITION,
            requisition_id,
            Action::UPDATED,
            format!("{} shifts added", created.len()),
            None,
        )
        .await
    {
        log::warn!("Failed to log shift creation: {}", e);
    }

    Ok(ApiResponse::created(created))
}

pub async fn get_recurrence_days(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    day_repo: web::Data<RecurrenceDayRepository>,
) -> Result<HttpResponse, AppError> {
    context_service.extract(&req).await?;

    let requisition_id = path.into_inner();
    let days = day_repo.get_days_by_requisition(requisition_id).await?;

    Ok(ApiResponse::success(days))
}
