use std::collections::BTreeMap;

/// One entry of the inbound authentication policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRule {
    /// Comma separated dotted-quad patterns, `*` matches any octet.
    Ip { pattern: String },
    /// Static shared token carried in `X-Token`.
    Token { token: String },
    /// Timestamp-nonce HMAC signature carried in `X-Sign`.
    Sign { secret: String },
    /// Entries with a type this build does not know; they never match.
    Unsupported,
}

impl AuthRule {
    /// Builds a rule from the flat string map used in configuration files.
    pub fn from_map(values: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| values.get(key).cloned().unwrap_or_default();
        match values.get("type").map(String::as_str) {
            Some("ip") => AuthRule::Ip {
                pattern: get("pattern"),
            },
            Some("token") => AuthRule::Token {
                token: get("token"),
            },
            Some("sign") => AuthRule::Sign {
                secret: get("secret"),
            },
            _ => AuthRule::Unsupported,
        }
    }
}
