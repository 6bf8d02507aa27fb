use std::sync::Arc;

use chrono::Utc;

use crate::{
    application::handlers::dispatch_engine::DispatchEngine,
    domain::{
        errors::DomainError,
        models::{EMAIL_SENDER_TYPE, Message},
    },
};

/// Validates a submission and hands it to the dispatch engine.
pub struct SendMessageUseCase {
    engine: Arc<DispatchEngine>,
}

impl SendMessageUseCase {
    pub fn new(engine: Arc<DispatchEngine>) -> Self {
        Self { engine }
    }

    /// Payload errors are returned before anything is queued. Delivery errors
    /// surface only for synchronous messages.
    pub async fn execute(&self, message: Message) -> Result<(), DomainError> {
        let mut message = message.ingest(Utc::now().timestamp())?;

        // Unregistered senders skip content decoding and fail at delivery.
        let structured = self
            .engine
            .registry()
            .get(&message.sender)
            .await
            .is_some_and(|sender| sender.configuration().sender_type() != EMAIL_SENDER_TYPE);
        message.decode_payload(structured)?;

        self.engine.submit(message).await
    }
}
