use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, broadcast};

use crate::domain::{
    errors::DomainError,
    models::{HistoryPage, HistoryQuery, HistoryRecord, Message, NewHistoryRecord, SenderConfig},
    repositories::{HistoryRepository, SenderConfigSource, SenderConfigStore},
};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Default)]
pub struct InMemoryHistoryRepository {
    records: Arc<RwLock<Vec<HistoryRecord>>>,
}

impl InMemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn insert(&self, record: NewHistoryRecord) -> anyhow::Result<HistoryRecord> {
        let mut records = self.records.write().await;
        let stored = HistoryRecord {
            id: records.len() as i64 + 1,
            message: record.message,
            err: record.err,
            req: record.req,
            resp: record.resp,
            status: record.status,
            received_at: record.received_at,
            created_at: Utc::now().timestamp(),
        };
        records.push(stored.clone());
        Ok(stored)
    }

    async fn query(&self, query: &HistoryQuery) -> anyhow::Result<HistoryPage> {
        let records = self.records.read().await;
        let matching: Vec<&HistoryRecord> = records
            .iter()
            .rev()
            .filter(|record| query.matches_columns(record) && matches_message(query, record))
            .collect();

        Ok(HistoryPage {
            count: matching.len() as u64,
            list: matching
                .into_iter()
                .skip(query.offset() as usize)
                .take(query.page_size as usize)
                .cloned()
                .collect(),
        })
    }
}

/// Substring filters on the stored message's `sender` and `content`.
fn matches_message(query: &HistoryQuery, record: &HistoryRecord) -> bool {
    if query.sender.is_none() && query.content.is_none() {
        return true;
    }
    let Ok(message) = serde_json::from_str::<Message>(&record.message) else {
        return false;
    };
    query
        .sender
        .as_deref()
        .is_none_or(|needle| message.sender.contains(needle))
        && query
            .content
            .as_deref()
            .is_none_or(|needle| message.content.contains(needle))
}

/// Sender configurations kept in process, keyed by name.
pub struct InMemorySenderConfigStore {
    configs: RwLock<BTreeMap<String, SenderConfig>>,
    changes: broadcast::Sender<()>,
}

impl InMemorySenderConfigStore {
    pub fn new() -> Self {
        Self::with_configs(Vec::new())
    }

    /// Seeds the store; later duplicates of a name replace earlier ones.
    pub fn with_configs(configs: Vec<SenderConfig>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            configs: RwLock::new(
                configs
                    .into_iter()
                    .map(|config| (config.name().to_string(), config))
                    .collect(),
            ),
            changes,
        }
    }

    fn notify(&self) {
        // No subscribers is fine.
        let _ = self.changes.send(());
    }
}

impl Default for InMemorySenderConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SenderConfigSource for InMemorySenderConfigStore {
    async fn list(&self) -> anyhow::Result<Vec<SenderConfig>> {
        Ok(self.configs.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl SenderConfigStore for InMemorySenderConfigStore {
    async fn create(&self, config: SenderConfig) -> anyhow::Result<()> {
        let mut configs = self.configs.write().await;
        let name = config.name().to_string();
        if configs.contains_key(&name) {
            return Err(DomainError::AlreadyExists(format!("sender {name}")).into());
        }
        configs.insert(name, config);
        drop(configs);
        self.notify();
        Ok(())
    }

    async fn update(&self, config: SenderConfig) -> anyhow::Result<()> {
        let mut configs = self.configs.write().await;
        let Some(slot) = configs.get_mut(config.name()) else {
            return Err(DomainError::NotFound(format!("sender {}", config.name())).into());
        };
        *slot = config;
        drop(configs);
        self.notify();
        Ok(())
    }

    async fn delete(&self, name: &str) -> anyhow::Result<()> {
        if self.configs.write().await.remove(name).is_none() {
            return Err(DomainError::NotFound(format!("sender {name}")).into());
        }
        self.notify();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}
