use std::time::Duration;

use reqwest::{Client, Request, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::domain::{errors::DomainError, models::Message};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Outbound HTTP client shared by every provider.
///
/// Transport failures are retried up to `max_attempts`; any response, good or
/// bad, ends the attempt loop.
#[derive(Clone)]
pub struct ProviderClient {
    http: Client,
    max_attempts: u32,
}

impl ProviderClient {
    pub fn new(max_attempts: u32) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("messenger-gateway")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub async fn execute(&self, builder: RequestBuilder) -> Exchange {
        let request = match builder.build() {
            Ok(request) => request,
            Err(err) => {
                return Exchange {
                    request_trace: String::new(),
                    result: Err(err.to_string()),
                };
            }
        };
        let request_trace = curl_trace(&request);

        let mut attempt = 1;
        let mut pending = request;
        let result = loop {
            let retry = pending.try_clone();
            match self.http.execute(pending).await {
                Ok(response) => break read_response(response).await,
                Err(err) => {
                    let Some(next) = retry.filter(|_| attempt < self.max_attempts) else {
                        break Err(err.to_string());
                    };
                    warn!(attempt, error = %err, "provider request failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                    pending = next;
                }
            }
        };

        Exchange {
            request_trace,
            result,
        }
    }
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self {
            http: Client::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: StatusCode,
    pub raw: String,
    /// Decoded body, `Null` when it is not JSON.
    pub body: Value,
}

/// One request/response pair as seen by the gateway.
#[derive(Debug)]
pub struct Exchange {
    pub request_trace: String,
    pub result: Result<ProviderResponse, String>,
}

impl Exchange {
    /// Copies the audit traces onto the message; a transport failure becomes
    /// its delivery error.
    pub fn record(&self, message: &mut Message) {
        message.request_trace = self.request_trace.clone();
        match &self.result {
            Ok(response) => {
                message.response_trace = json!({
                    "httpCode": response.status.as_u16(),
                    "body": response.raw,
                })
                .to_string();
            }
            Err(err) => message.delivery_error = Some(err.clone()),
        }
    }

    /// Success requires a transport success, HTTP 200 and `is_ok(body)`.
    pub fn check(
        self,
        context: &str,
        is_ok: impl Fn(&Value) -> bool,
    ) -> Result<ProviderResponse, DomainError> {
        let response = self
            .result
            .map_err(|err| DomainError::Provider(format!("{context}: {err}")))?;

        if response.status != StatusCode::OK || !is_ok(&response.body) {
            let pretty = serde_json::to_string_pretty(&response.body).unwrap_or_default();
            return Err(DomainError::Provider(format!(
                "{context} httpcode={} resp={pretty}",
                response.status.as_u16()
            )));
        }
        debug!(context, "provider accepted request");
        Ok(response)
    }
}

/// `body[key]` is the number zero.
pub fn zero_code(body: &Value, key: &str) -> bool {
    body.get(key).and_then(Value::as_f64) == Some(0.0)
}

async fn read_response(response: reqwest::Response) -> Result<ProviderResponse, String> {
    let status = response.status();
    let raw = response.text().await.map_err(|err| err.to_string())?;
    let body = serde_json::from_str(&raw).unwrap_or(Value::Null);
    Ok(ProviderResponse { status, raw, body })
}

/// Renders the request as a copy-pasteable curl command.
fn curl_trace(request: &Request) -> String {
    let mut parts = vec![
        "curl".to_string(),
        "-X".to_string(),
        request.method().to_string(),
        shell_quote(request.url().as_str()),
    ];
    for (name, value) in request.headers() {
        let value = value.to_str().unwrap_or("<binary>");
        parts.push("-H".to_string());
        parts.push(shell_quote(&format!("{name}: {value}")));
    }
    if let Some(bytes) = request.body().and_then(|body| body.as_bytes()) {
        parts.push("-d".to_string());
        parts.push(shell_quote(&String::from_utf8_lossy(bytes)));
    }
    parts.join(" ")
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
