use anyhow::{anyhow, Result};
use std::time::Duration;

/// Outbound notification delivery, consumed as a black box. Failures are the
/// caller's to log; nothing here ever blocks a domain operation.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub async fn notify(
        &self,
        template_key: &str,
        recipient: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            log::debug!(
                "Notification delivery disabled; dropping {} for {}",
                template_key,
                recipient
            );
            return Ok(());
        };

        let body = serde_json::json!({
            "templateKey": template_key,
            "recipient": recipient,
            "data": data,
        });

        let response = self
            .http
            .post(url)
            .timeout(Duration::from_secs(5))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("notification delivery failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "notification delivery returned {}",
                response.status()
            ));
        }

        Ok(())
    }
}
