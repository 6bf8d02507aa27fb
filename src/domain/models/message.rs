use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::DomainError;

/// Message types every provider understands in simple mode.
pub const SIMPLE_TEXT: &str = "text";
pub const SIMPLE_MARKDOWN: &str = "markdown";

/// Token that asks a provider to mention every member of the conversation.
pub const MENTION_ALL: &str = "@all";

/// A unified submission, owned by exactly one delivery at a time.
///
/// Wire fields are what callers submit and what ends up serialized in the
/// history row. The skipped fields are filled in while the message travels
/// through the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    #[serde(rename = "msgtype")]
    pub msg_type: String,
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "tos", default)]
    pub recipients: Vec<String>,
    #[serde(rename = "ccs", default)]
    pub cc_recipients: Vec<String>,
    #[serde(default)]
    pub extra: String,
    #[serde(rename = "sync", default)]
    pub synchronous: bool,
    #[serde(default)]
    pub simple: bool,
    #[serde(rename = "ats", default)]
    pub mentions: Vec<String>,
    #[serde(rename = "at_mobiles", default)]
    pub mentioned_phones: Vec<String>,

    #[serde(skip)]
    pub content_map: Map<String, Value>,
    #[serde(skip)]
    pub extra_map: Map<String, Value>,
    #[serde(skip)]
    pub received_at: i64,
    #[serde(skip)]
    pub request_trace: String,
    #[serde(skip)]
    pub response_trace: String,
    #[serde(skip)]
    pub delivery_error: Option<String>,
}

impl Message {
    /// Checks required fields, stamps the ingestion time and dedups mentions.
    pub fn ingest(mut self, received_at: i64) -> Result<Self, DomainError> {
        for (field, value) in [
            ("sender", &self.sender),
            ("msgtype", &self.msg_type),
            ("content", &self.content),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidPayload(format!(
                    "field {field} is required"
                )));
            }
        }

        self.received_at = received_at;
        self.mentions = dedup_stable(std::mem::take(&mut self.mentions));
        self.mentioned_phones = dedup_stable(std::mem::take(&mut self.mentioned_phones));
        Ok(self)
    }

    /// Decodes the JSON carried in `content` and `extra`.
    ///
    /// `structured_content` is false for simple submissions and for channels
    /// that take literal content (email style); `content` is left as is then.
    pub fn decode_payload(&mut self, structured_content: bool) -> Result<(), DomainError> {
        if structured_content && !self.simple && !self.content.is_empty() {
            self.content_map = decode_object("content", &self.content)?;
        }
        if !self.extra.is_empty() {
            self.extra_map = decode_object("extra", &self.extra)?;
        }
        Ok(())
    }

    pub fn mentions_everyone(&self) -> bool {
        self.mentions.iter().any(|s| s == MENTION_ALL)
            || self.mentioned_phones.iter().any(|s| s == MENTION_ALL)
    }

    /// Wire form stored in the history row.
    pub fn to_record_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn decode_object(field: &str, raw: &str) -> Result<Map<String, Value>, DomainError> {
    serde_json::from_str::<Map<String, Value>>(raw)
        .map_err(|err| DomainError::InvalidPayload(format!("{field} is not a JSON object: {err}")))
}

/// Removes duplicates, keeping the first occurrence of each entry.
pub fn dedup_stable(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Ids to pass to a provider's explicit mention list.
pub fn without_mention_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|s| s.as_str() != MENTION_ALL)
        .cloned()
        .collect()
}
