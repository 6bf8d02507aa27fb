use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};

use super::{
    append_tokens,
    http::{ProviderClient, zero_code},
    merge_body, text_body,
};
use crate::{
    application::services::{
        sender::{Sender, unsupported_simple_type},
        signing::sign_timestamp_secret,
    },
    domain::{
        errors::DomainError,
        models::{
            MENTION_ALL, Message, SIMPLE_MARKDOWN, SIMPLE_TEXT, SenderConfig,
            message::without_mention_all,
        },
    },
};

/// Dingtalk custom group bot.
///
/// https://open.dingtalk.com/document/orgapp/custom-bot-creation-and-installation
pub struct DingtalkBotSender {
    config: SenderConfig,
    client: ProviderClient,
}

impl DingtalkBotSender {
    pub fn new(config: SenderConfig, client: ProviderClient) -> Self {
        Self { config, client }
    }

    fn build_body(&self, message: &mut Message) -> Result<Value, DomainError> {
        let msg_type = message.msg_type.clone();
        if message.simple {
            match msg_type.as_str() {
                SIMPLE_TEXT => message.content_map = text_body("content", &message.content),
                SIMPLE_MARKDOWN => message.content_map = text_body("text", &message.content),
                other => return Err(unsupported_simple_type(&self.config, other)),
            }
        }
        if msg_type == SIMPLE_MARKDOWN {
            message
                .content_map
                .insert("title".to_string(), Value::String(message.title.clone()));
        }

        let mut at = Map::new();
        let has_mentions = !message.mentions.is_empty() || !message.mentioned_phones.is_empty();
        let text_key = match msg_type.as_str() {
            SIMPLE_TEXT => Some("content"),
            SIMPLE_MARKDOWN => Some("text"),
            _ => None,
        };
        if let (true, Some(text_key)) = (has_mentions, text_key) {
            at.insert("isAtAll".to_string(), json!(message.mentions_everyone()));
            at.insert("atUserIds".to_string(), json!(without_mention_all(&message.mentions)));
            at.insert(
                "atMobiles".to_string(),
                json!(without_mention_all(&message.mentioned_phones)),
            );

            let tokens: Vec<String> = message
                .mentions
                .iter()
                .chain(&message.mentioned_phones)
                .map(|s| {
                    if s == MENTION_ALL {
                        s.clone()
                    } else {
                        format!("@{s}")
                    }
                })
                .collect();
            append_tokens(&mut message.content_map, text_key, &tokens);
        }

        Ok(merge_body(
            &message.extra_map,
            [
                ("msgtype".to_string(), Value::String(msg_type.clone())),
                (msg_type, Value::Object(message.content_map.clone())),
                ("at".to_string(), Value::Object(at)),
            ],
        ))
    }

    /// `timestamp` and `sign` query parameters when a signing secret is set.
    fn signature_query(&self, timestamp_ms: i64) -> Option<[(&'static str, String); 2]> {
        let secret = self.config.get("token");
        if secret.is_empty() {
            return None;
        }
        Some([
            ("timestamp", timestamp_ms.to_string()),
            ("sign", sign_timestamp_secret(timestamp_ms, secret)),
        ])
    }
}

#[async_trait]
impl Sender for DingtalkBotSender {
    fn configuration(&self) -> &SenderConfig {
        &self.config
    }

    async fn send(&self, message: &mut Message) -> Result<(), DomainError> {
        let body = self.build_body(message)?;
        let mut request = self.client.http().post(self.config.get("url")).json(&body);
        if let Some(query) = self.signature_query(Utc::now().timestamp_millis()) {
            request = request.query(&query[..]);
        }
        let exchange = self.client.execute(request).await;
        exchange.record(message);
        exchange
            .check("send to dingding bot failed", |body| zero_code(body, "errcode"))
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn sender(url: &str, token: &str) -> DingtalkBotSender {
        let config = [
            ("name", "dd"),
            ("type", "dingdingBot"),
            ("url", url),
            ("token", token),
        ]
        .into_iter()
        .collect();
        DingtalkBotSender::new(config, ProviderClient::default())
    }

    fn simple(msg_type: &str, content: &str) -> Message {
        Message {
            sender: "dd".to_string(),
            msg_type: msg_type.to_string(),
            content: content.to_string(),
            simple: true,
            synchronous: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn mention_all_sets_flag_and_is_excluded_from_ids() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/robot/send")
            .match_query(Matcher::AllOf(vec![
                Matcher::Regex("timestamp=\\d+".to_string()),
                Matcher::Regex("sign=".to_string()),
            ]))
            .match_body(Matcher::PartialJson(json!({
                "msgtype": "text",
                "text": {"content": "hello \n @all"},
                "at": {"isAtAll": true, "atUserIds": [], "atMobiles": []}
            })))
            .with_status(200)
            .with_body(r#"{"errcode":0,"errmsg":"ok"}"#)
            .create_async()
            .await;

        let mut message = simple("text", "hello");
        message.mentions = vec!["@all".to_string()];
        sender(&format!("{}/robot/send", server.url()), "SECxyz")
            .send(&mut message)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn explicit_ids_and_phones_are_kept() {
        let mut message = simple("markdown", "## report");
        message.title = "Daily".to_string();
        message.mentions = vec!["u1".to_string()];
        message.mentioned_phones = vec!["13300000000".to_string(), "@all".to_string()];

        let body = sender("http://unused", "").build_body(&mut message).unwrap();
        assert_eq!(body["markdown"]["title"], "Daily");
        assert_eq!(body["markdown"]["text"], "## report \n @u1 @13300000000 @all");
        assert_eq!(body["at"]["isAtAll"], true);
        assert_eq!(body["at"]["atUserIds"], json!(["u1"]));
        assert_eq!(body["at"]["atMobiles"], json!(["13300000000"]));
    }

    #[test]
    fn no_mentions_means_empty_at() {
        let body = sender("http://unused", "")
            .build_body(&mut simple("text", "hello"))
            .unwrap();
        assert_eq!(body["text"], json!({"content": "hello"}));
        assert_eq!(body["at"], json!({}));
    }

    #[test]
    fn signature_only_when_token_configured() {
        assert!(sender("http://unused", "").signature_query(1).is_none());
        let query = sender("http://unused", "SECxyz")
            .signature_query(1_700_000_000_000)
            .unwrap();
        assert_eq!(query[0], ("timestamp", "1700000000000".to_string()));
        assert_eq!(query[1].1, "0PUR1j8g85Xg3vlFV/UrEcxXfF5HpCAGzcjrNfyJoyg=");
    }
}
