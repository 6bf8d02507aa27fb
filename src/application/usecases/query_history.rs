use std::sync::Arc;

use crate::domain::{
    errors::DomainError,
    models::{HistoryPage, HistoryQuery},
    repositories::HistoryRepository,
};

pub struct QueryHistoryUseCase {
    repo: Arc<dyn HistoryRepository>,
}

impl QueryHistoryUseCase {
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, query: HistoryQuery) -> Result<HistoryPage, DomainError> {
        if query.page_size == 0 {
            return Err(DomainError::invalid_payload("page_size must be positive"));
        }
        Ok(self.repo.query(&query).await?)
    }
}
