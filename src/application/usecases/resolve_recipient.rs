use std::sync::Arc;

use tracing::debug;

use crate::{application::services::registry::SenderRegistry, domain::errors::DomainError};

/// Looks up a provider-side user id by phone number.
pub struct ResolveRecipientUseCase {
    registry: Arc<SenderRegistry>,
}

impl ResolveRecipientUseCase {
    pub fn new(registry: Arc<SenderRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, sender: &str, phone: &str) -> Result<String, DomainError> {
        if phone.trim().is_empty() {
            return Err(DomainError::invalid_payload("field phone is required"));
        }
        let live = self
            .registry
            .get(sender)
            .await
            .ok_or_else(|| DomainError::UnknownSender(sender.to_string()))?;

        let Some(resolver) = live.recipient_resolver() else {
            let config = live.configuration();
            return Err(DomainError::UnsupportedCapability {
                sender: config.name().to_string(),
                sender_type: config.sender_type().to_string(),
                capability: "querying uid by phone",
            });
        };

        let uid = resolver.resolve_recipient_id(phone).await?;
        debug!(sender, "resolved recipient id");
        Ok(uid)
    }
}
