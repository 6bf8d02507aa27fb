use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    mappers::{domain_error, map_message},
    requests::{GetUidRequestDto, SendMessageRequestDto},
    responses::{AckResponseDto, UidResponseDto},
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    /// Submits a message. Synchronous submissions report the delivery result;
    /// asynchronous ones are acknowledged once queued.
    #[oai(path = "/message", method = "post", tag = EndpointsTags::Messages)]
    pub async fn push_message(
        &self,
        request: Json<SendMessageRequestDto>,
    ) -> PoemResult<Json<AckResponseDto>> {
        self.state
            .send_message_usecase
            .execute(map_message(request.0))
            .await
            .map_err(domain_error)?;

        Ok(Json(AckResponseDto::ok()))
    }

    /// Looks up the provider user id bound to a phone number.
    #[oai(path = "/uid/getbyphone", method = "post", tag = EndpointsTags::Messages)]
    pub async fn get_uid_by_phone(
        &self,
        request: Json<GetUidRequestDto>,
    ) -> PoemResult<Json<UidResponseDto>> {
        let uid = self
            .state
            .resolve_recipient_usecase
            .execute(&request.sender, &request.phone)
            .await
            .map_err(domain_error)?;

        Ok(Json(UidResponseDto { uid }))
    }
}
