use std::{collections::BTreeMap, sync::Arc};

use tracing::info;

use crate::domain::{
    errors::DomainError,
    models::SenderConfig,
    repositories::SenderConfigStore,
};

/// Create, update and delete sender configurations. Every successful change
/// is broadcast by the store and picked up by reconciliation.
pub struct ManageSendersUseCase {
    store: Arc<dyn SenderConfigStore>,
}

impl ManageSendersUseCase {
    pub fn new(store: Arc<dyn SenderConfigStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, values: BTreeMap<String, String>) -> Result<(), DomainError> {
        let config = validated(values)?;
        let name = config.name().to_string();
        self.store.create(config).await.map_err(into_domain)?;
        info!(sender = %name, "sender created");
        Ok(())
    }

    pub async fn update(&self, values: BTreeMap<String, String>) -> Result<(), DomainError> {
        let config = validated(values)?;
        let name = config.name().to_string();
        self.store.update(config).await.map_err(into_domain)?;
        info!(sender = %name, "sender updated");
        Ok(())
    }

    pub async fn delete(&self, values: BTreeMap<String, String>) -> Result<(), DomainError> {
        let name = values.get("name").map(|n| n.trim()).unwrap_or_default();
        if name.is_empty() {
            return Err(DomainError::invalid_payload("field name is required"));
        }
        self.store.delete(name).await.map_err(into_domain)?;
        info!(sender = %name, "sender deleted");
        Ok(())
    }
}

fn validated(values: BTreeMap<String, String>) -> Result<SenderConfig, DomainError> {
    for field in ["name", "type"] {
        if values.get(field).is_none_or(|v| v.trim().is_empty()) {
            return Err(DomainError::invalid_payload(format!("field {field} is required")));
        }
    }
    Ok(SenderConfig::new(values))
}

/// Keeps store errors that already carry a domain meaning.
fn into_domain(err: anyhow::Error) -> DomainError {
    err.downcast::<DomainError>().unwrap_or_else(DomainError::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::repositories::SenderConfigSource,
        infrastructure::repositories::in_memory::InMemorySenderConfigStore,
    };

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn lifecycle_maps_store_errors() {
        let store = Arc::new(InMemorySenderConfigStore::new());
        let usecase = ManageSendersUseCase::new(store.clone());
        let bot = values(&[("name", "bot"), ("type", "wechatBot"), ("url", "http://x")]);

        usecase.create(bot.clone()).await.unwrap();
        assert!(matches!(
            usecase.create(bot.clone()).await,
            Err(DomainError::AlreadyExists(_))
        ));

        usecase
            .update(values(&[("name", "bot"), ("type", "wechatBot"), ("url", "http://y")]))
            .await
            .unwrap();
        assert_eq!(store.list().await.unwrap()[0].get("url"), "http://y");

        usecase.delete(values(&[("name", "bot")])).await.unwrap();
        assert!(matches!(
            usecase.delete(values(&[("name", "bot")])).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn name_and_type_are_required() {
        let store = Arc::new(InMemorySenderConfigStore::new());
        let usecase = ManageSendersUseCase::new(store.clone());
        let err = usecase.create(values(&[("name", "bot")])).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid payload: field type is required");
        assert!(usecase.delete(values(&[])).await.is_err());
    }
}
