pub mod health;
pub mod histories;
pub mod messages;
pub mod root;
pub mod senders;
