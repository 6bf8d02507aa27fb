use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    application::services::sender::Sender,
    domain::{models::SenderConfig, repositories::SenderConfigSource},
    infrastructure::messaging::{ProviderClient, build_sender},
};

/// Live senders keyed by channel name, rebuilt from the configuration source.
pub struct SenderRegistry {
    source: Arc<dyn SenderConfigSource>,
    client: ProviderClient,
    senders: RwLock<HashMap<String, Arc<dyn Sender>>>,
}

impl SenderRegistry {
    pub fn new(source: Arc<dyn SenderConfigSource>, client: ProviderClient) -> Self {
        Self {
            source,
            client,
            senders: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Sender>> {
        self.senders.read().await.get(name).cloned()
    }

    /// Brings the live set in line with the source.
    ///
    /// Unchanged configurations keep their instance (and whatever state it
    /// caches). A failed fetch leaves the registry untouched.
    pub async fn reconcile(&self) {
        let configs = match self.source.list().await {
            Ok(configs) => configs,
            Err(err) => {
                error!(error = %err, "failed to load sender configs, registry unchanged");
                return;
            }
        };

        let mut seen = HashSet::with_capacity(configs.len());
        let mut created = 0usize;
        let mut senders = self.senders.write().await;
        for config in configs {
            let name = config.name().to_string();
            seen.insert(name.clone());

            if senders
                .get(&name)
                .is_some_and(|live| live.configuration() == &config)
            {
                continue;
            }
            match self.build(config) {
                Some(sender) => {
                    senders.insert(name, sender);
                    created += 1;
                }
                None => {
                    senders.remove(&name);
                }
            }
        }

        let before = senders.len();
        senders.retain(|name, _| seen.contains(name));
        info!(
            total = senders.len(),
            created,
            removed = before - senders.len(),
            "sender registry reconciled"
        );
    }

    fn build(&self, config: SenderConfig) -> Option<Arc<dyn Sender>> {
        let name = config.name().to_string();
        let sender_type = config.sender_type().to_string();
        let sender = build_sender(config, &self.client);
        if sender.is_none() {
            warn!(sender = %name, sender_type = %sender_type, "skipping sender with unknown type");
        }
        sender
    }

    #[cfg(test)]
    pub(crate) async fn install(&self, sender: Arc<dyn Sender>) {
        let name = sender.configuration().name().to_string();
        self.senders.write().await.insert(name, sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::in_memory::InMemorySenderConfigStore;

    fn config(name: &str, kind: &str, url: &str) -> SenderConfig {
        [("name", name), ("type", kind), ("url", url)]
            .into_iter()
            .collect()
    }

    fn registry(configs: Vec<SenderConfig>) -> (Arc<InMemorySenderConfigStore>, SenderRegistry) {
        let store = Arc::new(InMemorySenderConfigStore::with_configs(configs));
        let registry = SenderRegistry::new(store.clone(), ProviderClient::default());
        (store, registry)
    }

    #[tokio::test]
    async fn unchanged_configs_keep_their_instances() {
        let (_store, registry) = registry(vec![
            config("a", "wechatBot", "http://a"),
            config("b", "feishuBot", "http://b"),
        ]);
        registry.reconcile().await;
        let a = registry.get("a").await.unwrap();
        let b = registry.get("b").await.unwrap();

        registry.reconcile().await;
        assert!(Arc::ptr_eq(&a, &registry.get("a").await.unwrap()));
        assert!(Arc::ptr_eq(&b, &registry.get("b").await.unwrap()));
    }

    #[tokio::test]
    async fn changed_config_replaces_and_missing_config_removes() {
        use crate::domain::repositories::SenderConfigStore;

        let (store, registry) = registry(vec![
            config("a", "wechatBot", "http://a"),
            config("b", "feishuBot", "http://b"),
        ]);
        registry.reconcile().await;
        let before = registry.get("a").await.unwrap();

        store.update(config("a", "wechatBot", "http://a2")).await.unwrap();
        store.delete("b").await.unwrap();
        registry.reconcile().await;

        let after = registry.get("a").await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.configuration().get("url"), "http://a2");
        assert!(registry.get("b").await.is_none());
    }

    #[tokio::test]
    async fn unknown_types_are_skipped() {
        let (_store, registry) = registry(vec![
            config("a", "pigeon", "http://a"),
            config("b", "dingdingBot", "http://b"),
        ]);
        registry.reconcile().await;
        assert!(registry.get("a").await.is_none());
        assert!(registry.get("b").await.is_some());
    }

    struct BrokenSource;

    #[async_trait::async_trait]
    impl SenderConfigSource for BrokenSource {
        async fn list(&self) -> anyhow::Result<Vec<SenderConfig>> {
            anyhow::bail!("store unavailable")
        }
    }

    #[tokio::test]
    async fn failed_fetch_leaves_registry_untouched() {
        let registry = SenderRegistry::new(Arc::new(BrokenSource), ProviderClient::default());
        let sender = build_sender(config("a", "wechatBot", "http://a"), &ProviderClient::default())
            .unwrap();
        registry.install(sender).await;

        registry.reconcile().await;
        assert!(registry.get("a").await.is_some());
    }
}
