pub mod auth_rule;
pub mod history;
pub mod message;
pub mod sender_config;
pub mod sender_kind;

pub use auth_rule::AuthRule;
pub use history::{HistoryPage, HistoryQuery, HistoryRecord, NewHistoryRecord};
pub use message::{MENTION_ALL, Message, SIMPLE_MARKDOWN, SIMPLE_TEXT};
pub use sender_config::SenderConfig;
pub use sender_kind::{EMAIL_SENDER_TYPE, SenderKind};
