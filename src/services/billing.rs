use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::AppError;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLineItem {
    pub amount_cents: i64,
    pub description: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalInvoice {
    pub external_id: String,
    pub hosted_url: Option<String>,
    pub pdf_url: Option<String>,
    pub amount_due_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCustomer {
    pub email: String,
    #[serde(default)]
    pub deleted: bool,
}

/// The hosted billing provider, consumed through this seam only. A request
/// timeout is a failure, never an ambiguous success; the settlement engine
/// compensates on any error.
#[allow(async_fn_in_trait)]
pub trait BillingProvider {
    async fn create_invoice(
        &self,
        customer_handle: &str,
        line_items: &[ExternalLineItem],
        metadata: &HashMap<String, String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<ExternalInvoice, AppError>;

    async fn retrieve_customer(&self, handle: &str) -> Result<ExternalCustomer, AppError>;
}

#[derive(Clone)]
pub struct HostedBillingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HostedBillingClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::BillingNotConfigured("billing API key is not set".to_string())
        })
    }
}

impl BillingProvider for HostedBillingClient {
    async fn create_invoice(
        &self,
        customer_handle: &str,
        line_items: &[ExternalLineItem],
        metadata: &HashMap<String, String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<ExternalInvoice, AppError> {
        let api_key = self.api_key()?;

        let body = serde_json::json!({
            "customer": customer_handle,
            "lineItems": line_items,
            "metadata": metadata,
            "dueDate": due_date,
        });

        let response = self
            .http
            .post(format!("{}/invoices", self.base_url))
            .bearer_auth(api_key)
            .timeout(PROVIDER_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalProviderError(format!("invoice request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalProviderError(format!(
                "invoice request returned {}",
                response.status()
            )));
        }

        response.json::<ExternalInvoice>().await.map_err(|e| {
            AppError::ExternalProviderError(format!("invoice response unreadable: {}", e))
        })
    }

    async fn retrieve_customer(&self, handle: &str) -> Result<ExternalCustomer, AppError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .get(format!("{}/customers/{}", self.base_url, handle))
            .bearer_auth(api_key)
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalProviderError(format!("customer lookup failed: {}", e))
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::BillingNotConfigured(format!(
                "billing customer {} does not exist",
                handle
            )));
        }

        if !response.status().is_success() {
            return Err(AppError::ExternalProviderError(format!(
                "customer lookup returned {}",
                response.status()
            )));
        }

        response.json::<ExternalCustomer>().await.map_err(|e| {
            AppError::ExternalProviderError(format!("customer response unreadable: {}", e))
        })
    }
}
