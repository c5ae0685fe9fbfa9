//! Cache key derivation.
//!
//! A key is derived from the content kind label, the content path and the
//! tag list. Components are length-prefixed before hashing so that no two
//! distinct triples feed the same bytes into the digest.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "view";

/// Coarse content category used as the namespace of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Page,
    Block,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Page => "page",
            Kind::Block => "block",
        }
    }

    /// Kind label, suffixed with the device variant when one is given.
    ///
    /// `Kind::Block.label(Some("mobile"))` is `"block-mobile"`.
    pub fn label(self, device: Option<&str>) -> String {
        match device {
            Some(device) if !device.is_empty() => format!("{}-{device}", self.as_str()),
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived cache key for a rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Build the cache key for `(kind, path, tags)`.
///
/// Tags are sorted before hashing, so the same tags supplied in a different
/// order map to the same key. Duplicates are kept and do count.
pub fn build_key(kind: &str, path: &str, tags: &[String]) -> CacheKey {
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    update_component(&mut hasher, kind);
    update_component(&mut hasher, path);
    hasher.update((sorted.len() as u64).to_be_bytes());
    for tag in sorted {
        update_component(&mut hasher, tag);
    }

    CacheKey(format!(
        "{KEY_PREFIX}:{kind}:{}",
        hex::encode(hasher.finalize())
    ))
}

fn update_component(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

/// Convert a query mapping into `"<key>-<value>"` tags, in iteration order.
///
/// Anything other than a JSON object yields no tags.
pub fn derive_tags(query: Option<&Value>) -> Vec<String> {
    match query {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| format!("{key}-{}", tag_value(value)))
            .collect(),
        _ => Vec::new(),
    }
}

fn tag_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
