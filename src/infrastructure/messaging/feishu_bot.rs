use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{
    append_tokens,
    http::{ProviderClient, zero_code},
    merge_body, text_body,
};
use crate::{
    application::services::{
        sender::{Sender, unsupported_simple_type},
        signing::sign_timestamp_key,
    },
    domain::{
        errors::DomainError,
        models::{MENTION_ALL, Message, SIMPLE_TEXT, SenderConfig},
    },
};

/// Feishu custom group bot.
///
/// https://open.feishu.cn/document/client-docs/bot-v3/add-custom-bot
pub struct FeishuBotSender {
    config: SenderConfig,
    client: ProviderClient,
}

impl FeishuBotSender {
    pub fn new(config: SenderConfig, client: ProviderClient) -> Self {
        Self { config, client }
    }

    fn build_body(&self, message: &mut Message, timestamp: i64) -> Result<Value, DomainError> {
        if message.simple {
            match message.msg_type.as_str() {
                SIMPLE_TEXT => message.content_map = text_body("text", &message.content),
                other => return Err(unsupported_simple_type(&self.config, other)),
            }
        }

        if !message.mentions.is_empty() && message.msg_type == SIMPLE_TEXT {
            let tokens: Vec<String> = message
                .mentions
                .iter()
                .map(|s| {
                    let id = if s == MENTION_ALL { "all" } else { s.as_str() };
                    format!("<at user_id=\"{id}\"></at>")
                })
                .collect();
            append_tokens(&mut message.content_map, "text", &tokens);
        }

        let mut fields = vec![
            ("msg_type".to_string(), Value::String(message.msg_type.clone())),
            ("content".to_string(), Value::Object(message.content_map.clone())),
        ];
        let secret = self.config.get("secret");
        if !secret.is_empty() {
            fields.push(("timestamp".to_string(), Value::String(timestamp.to_string())));
            fields.push((
                "sign".to_string(),
                Value::String(sign_timestamp_key(timestamp, secret)),
            ));
        }

        Ok(merge_body(&message.extra_map, fields))
    }
}

#[async_trait]
impl Sender for FeishuBotSender {
    fn configuration(&self) -> &SenderConfig {
        &self.config
    }

    async fn send(&self, message: &mut Message) -> Result<(), DomainError> {
        let body = self.build_body(message, Utc::now().timestamp())?;
        let request = self.client.http().post(self.config.get("url")).json(&body);
        let exchange = self.client.execute(request).await;
        exchange.record(message);
        exchange
            .check("send to feishu bot failed", |body| zero_code(body, "code"))
            .map(|_| ())
    }
}
