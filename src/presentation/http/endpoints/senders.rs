use std::{collections::BTreeMap, sync::Arc};

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    mappers::domain_error,
    responses::AckResponseDto,
};

/// Sender configuration changes. Bodies are flat string maps with at least
/// `name`, plus `type` for create and update.
#[derive(Clone)]
pub struct SendersEndpoints {
    state: Arc<ApiState>,
}

impl SendersEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl SendersEndpoints {
    #[oai(path = "/senders", method = "post", tag = EndpointsTags::Senders)]
    pub async fn create_sender(
        &self,
        request: Json<BTreeMap<String, String>>,
    ) -> PoemResult<Json<AckResponseDto>> {
        self.state
            .manage_senders_usecase
            .create(request.0)
            .await
            .map_err(domain_error)?;
        Ok(Json(AckResponseDto::ok()))
    }

    #[oai(path = "/senders", method = "put", tag = EndpointsTags::Senders)]
    pub async fn update_sender(
        &self,
        request: Json<BTreeMap<String, String>>,
    ) -> PoemResult<Json<AckResponseDto>> {
        self.state
            .manage_senders_usecase
            .update(request.0)
            .await
            .map_err(domain_error)?;
        Ok(Json(AckResponseDto::ok()))
    }

    #[oai(path = "/senders", method = "delete", tag = EndpointsTags::Senders)]
    pub async fn delete_sender(
        &self,
        request: Json<BTreeMap<String, String>>,
    ) -> PoemResult<Json<AckResponseDto>> {
        self.state
            .manage_senders_usecase
            .delete(request.0)
            .await
            .map_err(domain_error)?;
        Ok(Json(AckResponseDto::ok()))
    }
}
