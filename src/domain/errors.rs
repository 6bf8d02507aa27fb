use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("cannot find sender with name {0}")]
    UnknownSender(String),
    #[error("sender with name {sender} and type {sender_type} does not support {capability}")]
    UnsupportedCapability {
        sender: String,
        sender_type: String,
        capability: &'static str,
    },
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
    #[error("send failed {0}")]
    Provider(String),
    #[error("delivery fault: {0}")]
    InternalFault(String),
    #[error("dispatch engine is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DomainError {
    pub fn invalid_payload(err: impl std::fmt::Display) -> Self {
        DomainError::InvalidPayload(err.to_string())
    }
}
