//! HMAC primitives shared by inbound request authentication and outbound
//! provider signing.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// RFC 3986 percent-encoding: only `A-Z a-z 0-9 - _ . ~` stay literal.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `k=v` pairs sorted by key, both sides percent-encoded, joined with `&`.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn query_string_to_sign(method: &str, path: &str, params: &BTreeMap<String, String>) -> String {
    format!(
        "{}&{}&{}",
        method,
        percent_encode(path),
        percent_encode(&canonical_query(params))
    )
}

/// Query-canonicalization signature (HMAC-SHA1, base64).
///
/// `params` must already hold both the query parameters and the form fields.
/// The key is used verbatim; SMS callers pass it through [`sms_signing_key`].
pub fn sign_query(method: &str, path: &str, params: &BTreeMap<String, String>, key: &str) -> String {
    let Ok(mut mac) = HmacSha1::new_from_slice(key.as_bytes()) else {
        return String::new();
    };
    mac.update(query_string_to_sign(method, path, params).as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

pub fn sms_signing_key(access_secret: &str) -> String {
    format!("{access_secret}&")
}

/// `key1value1key2value2...` with keys in lexicographic order.
pub fn sorted_pairs_payload(fields: &BTreeMap<String, String>) -> String {
    fields.iter().map(|(k, v)| format!("{k}{v}")).collect()
}

/// Timestamp-nonce signature over sorted key/value pairs (HMAC-SHA256, base64).
pub fn sign_sorted_pairs(fields: &BTreeMap<String, String>, secret: &str) -> String {
    hmac_sha256_base64(secret.as_bytes(), sorted_pairs_payload(fields).as_bytes())
}

/// Dingtalk bot signature: `"<timestamp_ms>\n<secret>"` keyed by the secret.
pub fn sign_timestamp_secret(timestamp_ms: i64, secret: &str) -> String {
    hmac_sha256_base64(secret.as_bytes(), format!("{timestamp_ms}\n{secret}").as_bytes())
}

/// Feishu bot signature: empty message keyed by `"<timestamp_s>\n<secret>"`.
pub fn sign_timestamp_key(timestamp_s: i64, secret: &str) -> String {
    hmac_sha256_base64(format!("{timestamp_s}\n{secret}").as_bytes(), b"")
}

fn hmac_sha256_base64(key: &[u8], data: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return String::new();
    };
    mac.update(data);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Compares every byte regardless of where the first mismatch is.
/// Empty signatures never match.
pub fn signatures_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || expected.len() != provided.len() {
        return false;
    }
    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// True when `timestamp` lies within `window_secs` of `now`, either side.
pub fn within_window(timestamp: i64, now: i64, window_secs: u64) -> bool {
    now.abs_diff(timestamp) <= window_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sms_params() -> BTreeMap<String, String> {
        map(&[
            ("AccessKeyId", "testid"),
            ("Action", "SendSms"),
            ("PhoneNumbers", "15300000001"),
            ("Timestamp", "2017-07-12T02:42:19Z"),
            ("TemplateParam", r#"{"code":"1234"}"#),
        ])
    }

    #[test]
    fn percent_encoding_keeps_only_unreserved() {
        assert_eq!(percent_encode("a b*c~d/é"), "a%20b%2Ac~d%2F%C3%A9");
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        assert_eq!(
            canonical_query(&sms_params()),
            "AccessKeyId=testid&Action=SendSms&PhoneNumbers=15300000001\
             &TemplateParam=%7B%22code%22%3A%221234%22%7D&Timestamp=2017-07-12T02%3A42%3A19Z"
        );
    }

    #[test]
    fn query_signature_matches_known_answer() {
        let params = sms_params();
        assert!(query_string_to_sign("POST", "/", &params).starts_with("POST&%2F&AccessKeyId%3Dtestid%26"));
        assert_eq!(
            sign_query("POST", "/", &params, &sms_signing_key("testsecret")),
            "mKdwHJIl6J6rbAmR5GrDPQPysog="
        );
    }

    #[test]
    fn query_signature_changes_with_any_input() {
        let params = sms_params();
        let base = sign_query("POST", "/", &params, "k&");
        assert_eq!(base, sign_query("POST", "/", &params, "k&"));

        let mut changed_value = params.clone();
        changed_value.insert("PhoneNumbers".into(), "15300000002".into());
        assert_ne!(base, sign_query("POST", "/", &changed_value, "k&"));

        let mut changed_key = params.clone();
        changed_key.insert("Extra".into(), String::new());
        assert_ne!(base, sign_query("POST", "/", &changed_key, "k&"));

        assert_ne!(base, sign_query("POST", "/", &params, "j&"));
    }

    #[test]
    fn sorted_pairs_signature_matches_known_answer() {
        let fields = map(&[
            ("sender", "botA"),
            ("content", "hello"),
            ("ts", "1700000000"),
            ("nonce", "abc"),
        ]);
        assert_eq!(sorted_pairs_payload(&fields), "contenthellononceabcsenderbotAts1700000000");
        assert_eq!(
            sign_sorted_pairs(&fields, "s3cret"),
            "F7P+jyuMITsw8gh/KFu0re9CteWjSC7SfYwRIt+LtXI="
        );
        assert_ne!(sign_sorted_pairs(&fields, "other"), sign_sorted_pairs(&fields, "s3cret"));
    }

    #[test]
    fn bot_signatures_match_known_answers() {
        assert_eq!(
            sign_timestamp_secret(1_700_000_000_000, "SECxyz"),
            "0PUR1j8g85Xg3vlFV/UrEcxXfF5HpCAGzcjrNfyJoyg="
        );
        assert_eq!(
            sign_timestamp_key(1_700_000_000, "secret"),
            "fiWS2+gh28DOydAv7hzONH/mDn9+b1Y4Y5ivXWXy8vA="
        );
    }

    #[test]
    fn signature_comparison() {
        assert!(signatures_match("abc", "abc"));
        assert!(!signatures_match("abc", "abd"));
        assert!(!signatures_match("abc", "abcd"));
        assert!(!signatures_match("", ""));
    }

    #[test]
    fn window_is_symmetric() {
        assert!(within_window(1000, 1060, 60));
        assert!(within_window(1060, 1000, 60));
        assert!(!within_window(1000, 1061, 60));
        assert!(!within_window(1061, 1000, 60));
        assert!(!within_window(i64::MIN, 1000, 60));
        assert!(!within_window(i64::MAX, -1000, 60));
    }
}
