pub mod manage_senders;
pub mod query_history;
pub mod resolve_recipient;
pub mod send_message;
