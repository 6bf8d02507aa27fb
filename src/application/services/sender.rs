use async_trait::async_trait;

use crate::domain::{
    errors::DomainError,
    models::{Message, SenderConfig},
};

/// One configured outbound channel bound to a provider family.
#[async_trait]
pub trait Sender: Send + Sync {
    /// The configuration this instance was built from.
    fn configuration(&self) -> &SenderConfig;

    /// Transforms the message into the provider's wire format and delivers it.
    ///
    /// Request and response traces are written back onto `message`.
    async fn send(&self, message: &mut Message) -> Result<(), DomainError>;

    /// Providers with contact lookup return themselves here.
    fn recipient_resolver(&self) -> Option<&dyn RecipientResolver> {
        None
    }
}

#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve_recipient_id(&self, phone: &str) -> Result<String, DomainError>;
}

/// Error for a simple-mode message type the provider has no mapping for.
pub fn unsupported_simple_type(config: &SenderConfig, msg_type: &str) -> DomainError {
    DomainError::Provider(format!(
        "sender type {} does not support simple type {}",
        config.sender_type(),
        msg_type
    ))
}
