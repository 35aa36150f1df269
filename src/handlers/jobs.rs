use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::Config;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::AgingService;

/// Constant-time comparison so the shared secret is not timeable.
fn token_matches(expected: &str, provided: &str) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Entry point for the external scheduler. Authenticates via the
/// X-Scheduler-Token shared secret; a mismatch is a 401 with no side
/// effects.
pub async fn close_outdated_requisitions(
    req: HttpRequest,
    config: web::Data<Config>,
    aging_service: web::Data<AgingService>,
) -> Result<HttpResponse, AppError> {
    let provided = req
        .headers()
        .get("X-Scheduler-Token")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !token_matches(&config.scheduler_secret, provided) {
        return Err(AppError::Unauthorized);
    }

    let summary = aging_service.close_outdated_requisitions().await?;

    Ok(ApiResponse::success(summary))
}
