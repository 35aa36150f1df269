use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::repositories::InvoiceRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::UserContextService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicesQuery {
    pub client_id: Option<Uuid>,
}

pub async fn get_invoices(
    query: web::Query<InvoicesQuery>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    invoice_repo: web::Data<InvoiceRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let invoices = invoice_repo.get_invoices(query.client_id).await?;

    Ok(ApiResponse::success(invoices))
}

pub async fn get_invoice(
    path: web::Path<Uuid>,
    req: HttpRequest,
    context_service: web::Data<UserContextService>,
    invoice_repo: web::Data<InvoiceRepository>,
) -> Result<HttpResponse, AppError> {
    let context = context_service.extract(&req).await?;
    context.requires_staff()?;

    let invoice = invoice_repo
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;

    Ok(ApiResponse::success(invoice))
}
