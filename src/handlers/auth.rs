use actix_web::{web, HttpRequest, HttpResponse};

use crate::database::models::{LoginInput, RegisterInput};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{AuthService, UserContextService};

pub async fn register(
    input: web::Json<RegisterInput>,
    auth_service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth_service
        .register(input.into_inner())
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;

    Ok(ApiResponse::created(response))
}

pub async fn login(
    input: web::Json<LoginInput>,
    auth_service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth_service
        .login(input.into_inner())
        .await
        .map_err(|_| AppError::Unauthorized)?;

    Ok(ApiResponse::success(response))
}

pub async fn me(
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    Ok(ApiResponse::success(context))
}
