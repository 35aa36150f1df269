use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::CreateAuditInput;
use crate::database::repositories::AuditRepository;

/// Build a metadata map from string pairs.
pub fn metadata(pairs: Vec<(&str, String)>) -> HashMap<String, serde_json::Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
        .collect()
}

#[derive(Clone)]
pub struct AuditLogger {
    repository: AuditRepository,
}

impl AuditLogger {
    pub fn new(repository: AuditRepository) -> Self {
        Self { repository }
    }

    /// Generic audit entry for custom cases
    pub async fn log(
        &self,
        actor_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<(), sqlx::Error> {
        let input = CreateAuditInput {
            actor_id,
            entity_type: entity_type.to_string(),
            entity_id,
            action: action.to_string(),
            description,
            metadata,
        };

        self.repository.log(input).await?;
        Ok(())
    }

    /// State transition entry capturing before/after status.
    pub async fn log_transition(
        &self,
        actor_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        description: String,
        before: String,
        after: String,
    ) -> Result<(), sqlx::Error> {
        let meta = metadata(vec![("before", before), ("after", after)]);
        self.log(
            actor_id,
            entity_type,
            entity_id,
            action,
            description,
            Some(meta),
        )
        .await
    }
}
