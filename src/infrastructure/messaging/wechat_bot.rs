use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    append_tokens,
    http::{ProviderClient, zero_code},
    merge_body, text_body,
};
use crate::{
    application::services::sender::{Sender, unsupported_simple_type},
    domain::{
        errors::DomainError,
        models::{Message, SIMPLE_MARKDOWN, SIMPLE_TEXT, SenderConfig},
    },
};

/// Wechat work group bot.
///
/// https://developer.work.weixin.qq.com/document/path/99110
pub struct WechatBotSender {
    config: SenderConfig,
    client: ProviderClient,
}

impl WechatBotSender {
    pub fn new(config: SenderConfig, client: ProviderClient) -> Self {
        Self { config, client }
    }

    fn build_body(&self, message: &mut Message) -> Result<Value, DomainError> {
        let msg_type = message.msg_type.clone();
        if message.simple {
            match msg_type.as_str() {
                SIMPLE_TEXT | SIMPLE_MARKDOWN => {
                    message.content_map = text_body("content", &message.content);
                }
                other => return Err(unsupported_simple_type(&self.config, other)),
            }
        }

        if !message.mentions.is_empty() {
            match msg_type.as_str() {
                SIMPLE_TEXT => {
                    message
                        .content_map
                        .insert("mentioned_list".to_string(), json!(message.mentions));
                }
                SIMPLE_MARKDOWN => {
                    let tokens: Vec<String> =
                        message.mentions.iter().map(|s| format!("<@{s}>")).collect();
                    append_tokens(&mut message.content_map, "content", &tokens);
                }
                _ => {}
            }
        }
        if !message.mentioned_phones.is_empty() && msg_type == SIMPLE_TEXT {
            message.content_map.insert(
                "mentioned_mobile_list".to_string(),
                json!(message.mentioned_phones),
            );
        }

        Ok(merge_body(
            &message.extra_map,
            [
                ("msgtype".to_string(), Value::String(msg_type.clone())),
                (msg_type, Value::Object(message.content_map.clone())),
            ],
        ))
    }
}

#[async_trait]
impl Sender for WechatBotSender {
    fn configuration(&self) -> &SenderConfig {
        &self.config
    }

    async fn send(&self, message: &mut Message) -> Result<(), DomainError> {
        let body = self.build_body(message)?;
        let request = self.client.http().post(self.config.get("url")).json(&body);
        let exchange = self.client.execute(request).await;
        exchange.record(message);
        exchange
            .check("wechat bot send failed", |body| zero_code(body, "errcode"))
            .map(|_| ())
    }
}
