use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{AdminFeeConfigInput, ClientInput};
use crate::database::repositories::{AdminFeeRepository, ClientRepository, UserRepository};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::UserContextService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDisciplineRequest {
    pub discipline: String,
    pub experience_level: Option<String>,
}

pub async fn get_fee_config(
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    fee_repo: web::Data<AdminFeeRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let config = fee_repo.get_fee_config().await?;

    Ok(ApiResponse::success(config))
}

pub async fn update_fee_config(
    input: web::Json<AdminFeeConfigInput>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    fee_repo: web::Data<AdminFeeRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_admin()?;

    let config = fee_repo.update_fee_config(input.into_inner()).await?;

    Ok(ApiResponse::success(config))
}

pub async fn create_client(
    input: web::Json<ClientInput>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    client_repo: web::Data<ClientRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let client = client_repo.create_client(input.into_inner()).await?;

    Ok(ApiResponse::created(client))
}

pub async fn get_clients(
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    client_repo: web::Data<ClientRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let clients = client_repo.get_clients().await?;

    Ok(ApiResponse::success(clients))
}

pub async fn add_candidate_discipline(
    path: web::Path<Uuid>,
    input: web::Json<AddDisciplineRequest>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    user_repo: web::Data<UserRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let user_id = path.into_inner();
    let input = input.into_inner();
    let discipline = user_repo
        .add_discipline(
            user_id,
            &input.discipline,
            input.experience_level.as_deref().unwrap_or("entry"),
        )
        .await?;

    Ok(ApiResponse::created(discipline))
}
