use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{
    http::{ProviderClient, zero_code},
    merge_body, text_body,
};
use crate::{
    application::services::sender::{RecipientResolver, Sender, unsupported_simple_type},
    domain::{
        errors::DomainError,
        models::{Message, SIMPLE_MARKDOWN, SIMPLE_TEXT, SenderConfig},
    },
};

const WECHAT_API_BASE: &str = "https://qyapi.weixin.qq.com/cgi-bin";

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Wechat work application messages.
///
/// https://developer.work.weixin.qq.com/document/path/90236
pub struct WechatAppSender {
    config: SenderConfig,
    client: ProviderClient,
    base_url: String,
    token: RwLock<Option<AccessToken>>,
    refresh: Mutex<()>,
}

impl WechatAppSender {
    pub fn new(config: SenderConfig, client: ProviderClient) -> Self {
        Self::with_base_url(config, client, WECHAT_API_BASE)
    }

    pub fn with_base_url(config: SenderConfig, client: ProviderClient, base_url: &str) -> Self {
        Self {
            config,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    async fn cached_token(&self) -> Option<String> {
        let now = Utc::now();
        self.token
            .read()
            .await
            .as_ref()
            .filter(|token| !token.value.is_empty() && token.expires_at > now)
            .map(|token| token.value.clone())
    }

    /// Returns a valid token, fetching a new one at most once across
    /// concurrent callers.
    async fn access_token(&self) -> Result<String, DomainError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let now = Utc::now();
        let request = self
            .client
            .http()
            .get(format!("{}/gettoken", self.base_url))
            .query(&[
                ("corpid", self.config.get("corpid")),
                ("corpsecret", self.config.get("corpsecret")),
            ]);
        let response = self
            .client
            .execute(request)
            .await
            .check("wechat get access token failed", |body| zero_code(body, "errcode"))?;

        let value = response.body["access_token"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let expires_in = response.body["expires_in"].as_i64().unwrap_or_default();
        let expires_at = TimeDelta::try_seconds(expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                DomainError::Provider(format!(
                    "wechat get access token failed: expires_in {expires_in} out of range"
                ))
            })?;
        debug!(sender = self.config.name(), expires_in, "refreshed wechat access token");

        *self.token.write().await = Some(AccessToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
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

        Ok(merge_body(
            &message.extra_map,
            [
                ("touser".to_string(), json!(message.recipients.join("|"))),
                ("agentid".to_string(), json!(self.config.get("agentid"))),
                ("msgtype".to_string(), Value::String(msg_type.clone())),
                (msg_type, Value::Object(message.content_map.clone())),
            ],
        ))
    }
}

#[async_trait]
impl Sender for WechatAppSender {
    fn configuration(&self) -> &SenderConfig {
        &self.config
    }

    async fn send(&self, message: &mut Message) -> Result<(), DomainError> {
        let token = self.access_token().await?;
        let body = self.build_body(message)?;

        let request = self
            .client
            .http()
            .post(format!("{}/message/send", self.base_url))
            .query(&[("access_token", token)])
            .json(&body);
        let exchange = self.client.execute(request).await;
        exchange.record(message);
        exchange
            .check("send to wechat app failed", |body| zero_code(body, "errcode"))
            .map(|_| ())
    }

    fn recipient_resolver(&self) -> Option<&dyn RecipientResolver> {
        Some(self)
    }
}

/// https://developer.work.weixin.qq.com/document/path/95402
#[async_trait]
impl RecipientResolver for WechatAppSender {
    async fn resolve_recipient_id(&self, phone: &str) -> Result<String, DomainError> {
        let token = self.access_token().await?;
        let request = self
            .client
            .http()
            .post(format!("{}/user/getuserid", self.base_url))
            .query(&[("access_token", token)])
            .json(&json!({ "mobile": phone }));

        let response = self
            .client
            .execute(request)
            .await
            .check("get uid by phone with wechat app failed", |body| {
                zero_code(body, "errcode")
            })?;

        match response.body["userid"].as_str() {
            Some(uid) if !uid.is_empty() => Ok(uid.to_string()),
            _ => Err(DomainError::NotFound(format!("user with phone {phone}"))),
        }
    }
}
