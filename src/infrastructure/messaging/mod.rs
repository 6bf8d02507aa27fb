//! Provider families.
//!
//! - Wechat work group bot (webhook)
//! - Wechat work application (access token + contact lookup)
//! - Feishu group bot (webhook, optional signature)
//! - Dingtalk group bot (webhook, optional signature)
//! - Aliyun SMS (signed query string)

mod aliyun_sms;
mod dingtalk_bot;
mod feishu_bot;
pub mod http;
mod wechat_app;
mod wechat_bot;

pub use aliyun_sms::AliyunSmsSender;
pub use dingtalk_bot::DingtalkBotSender;
pub use feishu_bot::FeishuBotSender;
pub use http::ProviderClient;
pub use wechat_app::WechatAppSender;
pub use wechat_bot::WechatBotSender;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    application::services::sender::Sender,
    domain::models::{SenderConfig, SenderKind},
};

/// Builds the sender for `config`'s type, `None` for unknown types.
pub fn build_sender(config: SenderConfig, client: &ProviderClient) -> Option<Arc<dyn Sender>> {
    let kind = SenderKind::from_type(config.sender_type())?;
    let client = client.clone();
    let sender: Arc<dyn Sender> = match kind {
        SenderKind::WechatBot => Arc::new(WechatBotSender::new(config, client)),
        SenderKind::WechatApp => Arc::new(WechatAppSender::new(config, client)),
        SenderKind::FeishuBot => Arc::new(FeishuBotSender::new(config, client)),
        SenderKind::DingtalkBot => Arc::new(DingtalkBotSender::new(config, client)),
        SenderKind::AliyunSms => Arc::new(AliyunSmsSender::new(config, client)),
    };
    Some(sender)
}

/// `extra` first, explicit fields second, so explicit fields win.
fn merge_body<I>(extra: &Map<String, Value>, explicit: I) -> Value
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut body = extra.clone();
    body.extend(explicit);
    Value::Object(body)
}

/// Appends ` \n <tokens>` to the string stored under `key`.
fn append_tokens(content: &mut Map<String, Value>, key: &str, tokens: &[String]) {
    let current = match content.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    content.insert(
        key.to_string(),
        Value::String(format!("{} \n {}", current, tokens.join(" "))),
    );
}

fn text_body(key: &str, text: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(text.to_string()));
    map
}
