use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    application::services::signing::{sign_sorted_pairs, signatures_match, within_window},
    domain::{errors::DomainError, models::AuthRule},
};

pub const TOKEN_HEADER: &str = "X-Token";
pub const TIMESTAMP_HEADER: &str = "X-TS";
pub const NONCE_HEADER: &str = "X-Nonce";
pub const SIGNATURE_HEADER: &str = "X-Sign";

/// Accepted clock skew for signed requests, in seconds.
pub const REPLAY_WINDOW_SECS: u64 = 60;

/// The parts of an inbound call the rules look at.
#[derive(Debug, Default, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub client_ip: &'a str,
    pub token: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

/// Ordered OR over the configured rules. No rules means no authentication.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    rules: Vec<AuthRule>,
}

impl AuthGate {
    pub fn new(rules: Vec<AuthRule>) -> Self {
        Self { rules }
    }

    pub fn is_open(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn authenticate(&self, request: &InboundRequest<'_>, now: i64) -> Result<(), DomainError> {
        if self.is_open() {
            return Ok(());
        }

        let matched = self.rules.iter().any(|rule| match rule {
            AuthRule::Ip { pattern } => ip_matches(pattern, request.client_ip),
            AuthRule::Token { token } => {
                !token.is_empty() && request.token.is_some_and(|t| signatures_match(token, t))
            }
            AuthRule::Sign { secret } => signature_matches(secret, request, now),
            AuthRule::Unsupported => false,
        });

        if matched {
            Ok(())
        } else {
            debug!(client_ip = request.client_ip, "inbound request rejected by auth gate");
            Err(DomainError::Unauthorized)
        }
    }
}

/// `pattern` is a comma separated list such as `10.0.*.*,127.0.0.1`.
pub fn ip_matches(pattern: &str, ip: &str) -> bool {
    let octets: Vec<&str> = ip.split('.').collect();
    pattern.split(',').map(str::trim).any(|candidate| {
        let parts: Vec<&str> = candidate.split('.').collect();
        parts.len() == octets.len()
            && parts
                .iter()
                .zip(&octets)
                .all(|(p, o)| *p == "*" || p == o)
    })
}

fn signature_matches(secret: &str, request: &InboundRequest<'_>, now: i64) -> bool {
    let (Some(ts), Some(signature)) = (request.timestamp, request.signature) else {
        return false;
    };
    let Ok(timestamp) = ts.trim().parse::<i64>() else {
        return false;
    };
    if timestamp == 0 || !within_window(timestamp, now, REPLAY_WINDOW_SECS) {
        return false;
    }
    let Some(fields) = signing_fields(request.body, request.nonce.unwrap_or_default(), ts) else {
        return false;
    };

    signatures_match(&sign_sorted_pairs(&fields, secret), signature)
}

/// Body fields plus the injected `nonce` and `ts`.
///
/// The body must be a JSON object (or empty). String values are taken
/// verbatim, anything else in its JSON text form.
pub fn signing_fields(body: &[u8], nonce: &str, ts: &str) -> Option<BTreeMap<String, String>> {
    let object: Map<String, Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        serde_json::from_slice(body).ok()?
    };

    let mut fields: BTreeMap<String, String> = object
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect();
    fields.insert("nonce".to_string(), nonce.to_string());
    fields.insert("ts".to_string(), ts.to_string());
    Some(fields)
}

/// Client side of the `sign` rule: the value to put in `X-Sign`.
pub fn sign_request(body: &[u8], nonce: &str, ts: &str, secret: &str) -> Option<String> {
    signing_fields(body, nonce, ts).map(|fields| sign_sorted_pairs(&fields, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn gate(rules: Vec<AuthRule>) -> AuthGate {
        AuthGate::new(rules)
    }

    fn sign_rule() -> AuthRule {
        AuthRule::Sign {
            secret: "s3cret".to_string(),
        }
    }

    #[test]
    fn empty_policy_lets_everything_through() {
        assert!(gate(vec![]).authenticate(&InboundRequest::default(), NOW).is_ok());
    }

    #[test]
    fn ip_patterns_support_wildcards_and_alternatives() {
        assert!(ip_matches("10.0.*.*", "10.0.3.4"));
        assert!(ip_matches("192.168.1.1, 10.*.*.*", "10.9.9.9"));
        assert!(!ip_matches("10.0.*.*", "10.1.3.4"));
        assert!(!ip_matches("10.0.*", "10.0.3.4"));
        assert!(!ip_matches("*.*.*.*", "::1"));
    }

    #[test]
    fn token_rule_requires_exact_non_empty_token() {
        let g = gate(vec![AuthRule::Token {
            token: "t0k".to_string(),
        }]);
        let ok = InboundRequest {
            token: Some("t0k"),
            ..Default::default()
        };
        let bad = InboundRequest {
            token: Some("t0kk"),
            ..Default::default()
        };
        assert!(g.authenticate(&ok, NOW).is_ok());
        assert!(matches!(g.authenticate(&bad, NOW), Err(DomainError::Unauthorized)));

        let empty = gate(vec![AuthRule::Token { token: String::new() }]);
        let blank = InboundRequest {
            token: Some(""),
            ..Default::default()
        };
        assert!(empty.authenticate(&blank, NOW).is_err());
    }

    #[test]
    fn signed_request_within_window_is_accepted() {
        let body = br#"{"sender":"botA","content":"hello","simple":true}"#;
        let ts = NOW.to_string();
        let signature = sign_request(body, "n1", &ts, "s3cret").unwrap();
        let request = InboundRequest {
            client_ip: "1.2.3.4",
            timestamp: Some(&ts),
            nonce: Some("n1"),
            signature: Some(&signature),
            body,
            ..Default::default()
        };

        assert!(gate(vec![sign_rule()]).authenticate(&request, NOW + 59).is_ok());
    }

    #[test]
    fn correctly_signed_request_outside_window_is_rejected() {
        let body = br#"{"sender":"botA"}"#;
        for ts in [NOW - 61, NOW + 61] {
            let ts = ts.to_string();
            let signature = sign_request(body, "n1", &ts, "s3cret").unwrap();
            let request = InboundRequest {
                timestamp: Some(&ts),
                nonce: Some("n1"),
                signature: Some(&signature),
                body,
                ..Default::default()
            };
            assert!(gate(vec![sign_rule()]).authenticate(&request, NOW).is_err());
        }
    }

    #[test]
    fn extreme_timestamps_are_rejected() {
        let body = br#"{"sender":"botA"}"#;
        for ts in [i64::MIN, i64::MIN + 1, i64::MAX] {
            let ts = ts.to_string();
            let signature = sign_request(body, "n1", &ts, "s3cret").unwrap();
            let request = InboundRequest {
                timestamp: Some(&ts),
                nonce: Some("n1"),
                signature: Some(&signature),
                body,
                ..Default::default()
            };
            for now in [NOW, -NOW, 0] {
                assert!(gate(vec![sign_rule()]).authenticate(&request, now).is_err());
            }
        }
    }

    #[test]
    fn tampered_body_or_nonce_is_rejected() {
        let ts = NOW.to_string();
        let signature = sign_request(br#"{"sender":"botA"}"#, "n1", &ts, "s3cret").unwrap();
        let tampered = InboundRequest {
            timestamp: Some(&ts),
            nonce: Some("n1"),
            signature: Some(&signature),
            body: br#"{"sender":"botB"}"#,
            ..Default::default()
        };
        let other_nonce = InboundRequest {
            nonce: Some("n2"),
            body: br#"{"sender":"botA"}"#,
            ..tampered
        };
        let g = gate(vec![sign_rule()]);
        assert!(g.authenticate(&tampered, NOW).is_err());
        assert!(g.authenticate(&other_nonce, NOW).is_err());
    }

    #[test]
    fn any_matching_rule_is_enough() {
        let g = gate(vec![
            AuthRule::Unsupported,
            AuthRule::Ip {
                pattern: "127.0.0.1".to_string(),
            },
            sign_rule(),
        ]);
        let local = InboundRequest {
            client_ip: "127.0.0.1",
            ..Default::default()
        };
        let remote = InboundRequest {
            client_ip: "8.8.8.8",
            ..Default::default()
        };
        assert!(g.authenticate(&local, NOW).is_ok());
        assert!(g.authenticate(&remote, NOW).is_err());
    }

    #[test]
    fn non_string_body_values_are_signed_in_json_form() {
        let fields = signing_fields(br#"{"sync":true,"ats":["a"]}"#, "n", "1").unwrap();
        assert_eq!(fields["sync"], "true");
        assert_eq!(fields["ats"], r#"["a"]"#);
        assert!(signing_fields(b"[1]", "n", "1").is_none());
    }
}
