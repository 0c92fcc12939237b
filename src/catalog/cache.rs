//! Failure timestamp cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Epoch-second timestamp of the first observed failure of each server url
/// since its last success.
///
/// A url is present only while its server keeps failing; it leaves the cache
/// when the server recovers. Purging a server keeps its entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureCache {
    entries: BTreeMap<String, i64>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<i64> {
        self.entries.get(url).copied()
    }

    #[cfg(test)]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Record a failure at `now` unless one is already pending.
    pub fn record_failure(&mut self, url: &str, now: i64) {
        self.entries.entry(url.to_string()).or_insert(now);
    }

    /// Forget a url, returning the timestamp it was first seen failing.
    pub fn clear(&mut self, url: &str) -> Option<i64> {
        self.entries.remove(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, i64)> for FailureCache {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_keeps_first_timestamp() {
        let mut cache = FailureCache::new();
        cache.record_failure("rtmp://a.example.com/live", 100);
        cache.record_failure("rtmp://a.example.com/live", 200);
        assert_eq!(cache.get("rtmp://a.example.com/live"), Some(100));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache: FailureCache = [("rtmp://a.example.com/live".to_string(), 42)]
            .into_iter()
            .collect();
        assert_eq!(cache.clear("rtmp://a.example.com/live"), Some(42));
        assert_eq!(cache.clear("rtmp://a.example.com/live"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let cache: FailureCache =
            serde_json::from_str(r#"{"rtmp://b.example.com/live": 20, "a.example.com": 10}"#).unwrap();
        assert!(cache.contains("a.example.com"));
        assert_eq!(
            serde_json::to_string(&cache).unwrap(),
            r#"{"a.example.com":10,"rtmp://b.example.com/live":20}"#
        );
    }
}
