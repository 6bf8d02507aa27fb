use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::usecases::{
    manage_senders::ManageSendersUseCase, query_history::QueryHistoryUseCase,
    resolve_recipient::ResolveRecipientUseCase, send_message::SendMessageUseCase,
};

#[derive(Clone)]
pub struct ApiState {
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub resolve_recipient_usecase: Arc<ResolveRecipientUseCase>,
    pub manage_senders_usecase: Arc<ManageSendersUseCase>,
    pub query_history_usecase: Arc<QueryHistoryUseCase>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Messages,
    Senders,
    Histories,
}
