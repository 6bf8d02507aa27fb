use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Query, payload::Json};

use crate::{
    domain::models::HistoryQuery,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{domain_error, map_history_page},
        responses::HistoryPageDto,
    },
};

#[derive(Clone)]
pub struct HistoriesEndpoints {
    state: Arc<ApiState>,
}

impl HistoriesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl HistoriesEndpoints {
    /// Delivery history, newest first. `start` and `end` bound the receive
    /// time (unix seconds, inclusive); `page_index` is 1-based.
    #[oai(path = "/histories", method = "get", tag = EndpointsTags::Histories)]
    pub async fn query_histories(
        &self,
        page_index: Query<u32>,
        page_size: Query<u32>,
        start: Query<Option<i64>>,
        end: Query<Option<i64>>,
        status: Query<Option<bool>>,
        sender: Query<Option<String>>,
        content: Query<Option<String>>,
    ) -> PoemResult<Json<HistoryPageDto>> {
        let query = HistoryQuery {
            page_index: page_index.0,
            page_size: page_size.0,
            start: start.0,
            end: end.0,
            status: status.0,
            sender: sender.0,
            content: content.0,
        };

        let page = self
            .state
            .query_history_usecase
            .execute(query)
            .await
            .map_err(domain_error)?;

        Ok(Json(map_history_page(page)))
    }
}
