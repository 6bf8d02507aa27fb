use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::models::{HistoryPage, HistoryQuery, HistoryRecord, NewHistoryRecord, SenderConfig};

/// Durable log of delivery attempts. Must accept concurrent writes.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn insert(&self, record: NewHistoryRecord) -> anyhow::Result<HistoryRecord>;

    async fn query(&self, query: &HistoryQuery) -> anyhow::Result<HistoryPage>;
}

/// Read side of the sender configuration, consumed by reconciliation.
#[async_trait]
pub trait SenderConfigSource: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<SenderConfig>>;
}

/// Write side of the sender configuration plus its change notification.
#[async_trait]
pub trait SenderConfigStore: SenderConfigSource {
    async fn create(&self, config: SenderConfig) -> anyhow::Result<()>;

    async fn update(&self, config: SenderConfig) -> anyhow::Result<()>;

    async fn delete(&self, name: &str) -> anyhow::Result<()>;

    /// Fires `()` after every successful change.
    fn subscribe(&self) -> broadcast::Receiver<()>;
}
