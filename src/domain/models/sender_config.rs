use std::collections::BTreeMap;

/// Flat key/value description of one configured channel.
///
/// `name` and `type` are always present once validated; everything else is
/// provider specific (url, secrets, template codes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderConfig(BTreeMap<String, String>);

impl SenderConfig {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self(values)
    }

    pub fn name(&self) -> &str {
        self.get("name")
    }

    pub fn sender_type(&self) -> &str {
        self.get("type")
    }

    /// Missing keys read as empty strings.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SenderConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
