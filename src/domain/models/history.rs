use serde::{Deserialize, Serialize};

use super::message::Message;

/// Immutable audit row, one per completed delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: i64,
    pub message: String,
    pub err: String,
    pub req: String,
    pub resp: String,
    pub status: bool,
    pub received_at: i64,
    pub created_at: i64,
}

/// Row content before the recorder assigns id and creation time.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub message: String,
    pub err: String,
    pub req: String,
    pub resp: String,
    pub status: bool,
    pub received_at: i64,
}

impl From<&Message> for NewHistoryRecord {
    fn from(message: &Message) -> Self {
        let err = message.delivery_error.clone().unwrap_or_default();
        Self {
            message: message.to_record_json(),
            status: message.delivery_error.is_none(),
            err,
            req: message.request_trace.clone(),
            resp: message.response_trace.clone(),
            received_at: message.received_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// 1-based.
    pub page_index: u32,
    pub page_size: u32,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub status: Option<bool>,
    pub sender: Option<String>,
    pub content: Option<String>,
}

impl HistoryQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index.max(1) - 1) * u64::from(self.page_size)
    }

    /// Applies every filter except the substring ones, which need the decoded
    /// message.
    pub fn matches_columns(&self, record: &HistoryRecord) -> bool {
        self.start.is_none_or(|start| record.received_at >= start)
            && self.end.is_none_or(|end| record.received_at <= end)
            && self.status.is_none_or(|status| record.status == status)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryPage {
    pub count: u64,
    pub list: Vec<HistoryRecord>,
}
