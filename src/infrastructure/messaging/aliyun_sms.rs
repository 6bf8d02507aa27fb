use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::http::ProviderClient;
use crate::{
    application::services::{
        sender::Sender,
        signing::{sign_query, sms_signing_key},
    },
    domain::{
        errors::DomainError,
        models::{Message, SenderConfig},
    },
};

const ALIYUN_SMS_BASE: &str = "http://dysmsapi.aliyuncs.com";

/// Aliyun SMS `SendSms`. `content` carries the template parameters as JSON.
///
/// https://help.aliyun.com/zh/sms/developer-reference/api-dysmsapi-2017-05-25-sendsms
pub struct AliyunSmsSender {
    config: SenderConfig,
    client: ProviderClient,
    base_url: String,
}

impl AliyunSmsSender {
    pub fn new(config: SenderConfig, client: ProviderClient) -> Self {
        Self::with_base_url(config, client, ALIYUN_SMS_BASE)
    }

    pub fn with_base_url(config: SenderConfig, client: ProviderClient, base_url: &str) -> Self {
        Self {
            config,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn form(&self, message: &Message) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("PhoneNumbers".to_string(), message.recipients.join(",")),
            ("SignName".to_string(), self.config.get("signName").to_string()),
            (
                "TemplateCode".to_string(),
                self.config.get("templateCode").to_string(),
            ),
            ("TemplateParam".to_string(), message.content.clone()),
        ])
    }

    /// Common request parameters, `Signature` included.
    fn query(
        &self,
        form: &BTreeMap<String, String>,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let mut query: BTreeMap<String, String> = [
            ("Action", "SendSms"),
            ("Version", "2017-05-25"),
            ("Format", "JSON"),
            ("AccessKeyId", self.config.get("accessKey")),
            ("SignatureNonce", nonce),
            ("SignatureMethod", "HMAC-SHA1"),
            ("SignatureVersion", "1.0"),
            ("AcceptLanguage", "zh-CN"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        query.insert(
            "Timestamp".to_string(),
            now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );

        let mut signed = query.clone();
        signed.extend(form.iter().map(|(k, v)| (k.clone(), v.clone())));
        let key = sms_signing_key(self.config.get("accessSecret"));
        query.insert("Signature".to_string(), sign_query("POST", "/", &signed, &key));
        query
    }
}

#[async_trait]
impl Sender for AliyunSmsSender {
    fn configuration(&self) -> &SenderConfig {
        &self.config
    }

    async fn send(&self, message: &mut Message) -> Result<(), DomainError> {
        let form = self.form(message);
        let query = self.query(&form, &Uuid::new_v4().to_string(), Utc::now());

        let request = self
            .client
            .http()
            .post(format!("{}/", self.base_url))
            .query(&query)
            .form(&form);
        let exchange = self.client.execute(request).await;
        exchange.record(message);
        exchange
            .check("send to ali sms failed", |body| {
                body.get("Code").and_then(Value::as_str) == Some("OK")
            })
            .map(|_| ())
    }
}
