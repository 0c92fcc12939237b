//! Configuration module for ingestcheck.
//!
//! Compiled-in defaults, overridable through environment variables.

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

/// Slightly less than two days.
pub const DEFAULT_PURGE_AGE_SECS: i64 = 151_200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Services doing custom things the probes cannot check.
pub const DEFAULT_SKIPPED_SERVICES: [&str; 3] = ["YouNow", "SHOWROOM", "Dacast"];

/// Check run configuration.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Service catalog (default: "plugins/rtmp-services/data/services.json")
    pub services_path: String,
    /// Package descriptor (default: "plugins/rtmp-services/data/package.json")
    pub package_path: String,
    /// Failure timestamp cache (default: "other/timestamps.json")
    pub cache_path: String,
    /// Per-probe timeout (default: 10s)
    pub timeout: Duration,
    /// Failure age after which a server is purged, in seconds
    pub purge_age_secs: i64,
    /// Service names that are never probed
    pub skipped_services: BTreeSet<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            services_path: "plugins/rtmp-services/data/services.json".to_string(),
            package_path: "plugins/rtmp-services/data/package.json".to_string(),
            cache_path: "other/timestamps.json".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            purge_age_secs: DEFAULT_PURGE_AGE_SECS,
            skipped_services: DEFAULT_SKIPPED_SERVICES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl CheckerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `INGESTCHECK_SERVICES_FILE`: catalog path
    /// - `INGESTCHECK_PACKAGE_FILE`: package descriptor path
    /// - `INGESTCHECK_CACHE_FILE`: failure cache path
    /// - `INGESTCHECK_TIMEOUT_SECS`: per-probe timeout (default: 10)
    /// - `INGESTCHECK_PURGE_AGE_SECS`: purge age (default: 151200)
    /// - `INGESTCHECK_SKIPPED_SERVICES`: comma-separated service names
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup("INGESTCHECK_SERVICES_FILE") {
            cfg.services_path = path;
        }

        if let Some(path) = lookup("INGESTCHECK_PACKAGE_FILE") {
            cfg.package_path = path;
        }

        if let Some(path) = lookup("INGESTCHECK_CACHE_FILE") {
            cfg.cache_path = path;
        }

        if let Some(secs_str) = lookup("INGESTCHECK_TIMEOUT_SECS") {
            if let Ok(secs) = secs_str.parse::<u64>() {
                if secs > 0 {
                    cfg.timeout = Duration::from_secs(secs);
                }
            }
        }

        if let Some(age_str) = lookup("INGESTCHECK_PURGE_AGE_SECS") {
            if let Ok(age) = age_str.parse::<i64>() {
                cfg.purge_age_secs = age;
            }
        }

        if let Some(names) = lookup("INGESTCHECK_SKIPPED_SERVICES") {
            cfg.skipped_services = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let cfg = CheckerConfig::default();
        assert_eq!(cfg.services_path, "plugins/rtmp-services/data/services.json");
        assert_eq!(cfg.package_path, "plugins/rtmp-services/data/package.json");
        assert_eq!(cfg.cache_path, "other/timestamps.json");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.purge_age_secs, 151_200);
        assert!(cfg.purge_age_secs < 2 * 24 * 60 * 60);
        assert!(cfg.skipped_services.contains("SHOWROOM"));
        assert_eq!(cfg.skipped_services.len(), 3);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INGESTCHECK_CACHE_FILE", "/tmp/cache.json"),
            ("INGESTCHECK_TIMEOUT_SECS", "3"),
            ("INGESTCHECK_PURGE_AGE_SECS", "60"),
            ("INGESTCHECK_SKIPPED_SERVICES", "YouNow, Other ,"),
        ]
        .into_iter()
        .collect();

        let cfg = CheckerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.cache_path, "/tmp/cache.json");
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.purge_age_secs, 60);
        assert_eq!(
            cfg.skipped_services.into_iter().collect::<Vec<_>>(),
            vec!["Other".to_string(), "YouNow".to_string()]
        );
        assert_eq!(cfg.services_path, "plugins/rtmp-services/data/services.json");
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = CheckerConfig::from_lookup(|key| match key {
            "INGESTCHECK_TIMEOUT_SECS" => Some("ten".to_string()),
            "INGESTCHECK_PURGE_AGE_SECS" => Some("".to_string()),
            _ => None,
        });
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.purge_age_secs, 151_200);
    }
}
