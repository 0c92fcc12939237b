//! JSON file storage for the catalog, package descriptor and failure cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::cache::FailureCache;
use super::models::{Catalog, Package};

/// Storage error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File locations of everything a check run reads and writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    services_path: PathBuf,
    package_path: PathBuf,
    cache_path: PathBuf,
}

impl FileStore {
    pub fn new(
        services_path: impl Into<PathBuf>,
        package_path: impl Into<PathBuf>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            services_path: services_path.into(),
            package_path: package_path.into(),
            cache_path: cache_path.into(),
        }
    }

    pub fn load_catalog(&self) -> Result<Catalog, StoreError> {
        read_json(&self.services_path)
    }

    pub fn load_package(&self) -> Result<Package, StoreError> {
        read_json(&self.package_path)
    }

    /// Load the failure cache. A missing file is an empty cache.
    pub fn load_cache(&self) -> Result<FailureCache, StoreError> {
        if !self.cache_path.exists() {
            return Ok(FailureCache::new());
        }
        tracing::info!("Found cache file: {}", self.cache_path.display());
        read_json(&self.cache_path)
    }

    /// Write the catalog with 4-space indentation, non-ASCII kept literal.
    pub fn save_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        write_json(&self.services_path, catalog, true)
    }

    pub fn save_package(&self, package: &Package) -> Result<(), StoreError> {
        write_json(&self.package_path, package, true)
    }

    /// Write the cache compactly, creating its directory if needed.
    pub fn save_cache(&self, cache: &FailureCache) -> Result<(), StoreError> {
        if let Some(dir) = self.cache_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        write_json(&self.cache_path, cache, false)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&data).map_err(|e| StoreError::json(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<(), StoreError> {
    let encoded = if pretty {
        to_indented_json(value)
    } else {
        serde_json::to_vec(value)
    };
    let data = encoded.map_err(|e| StoreError::json(path, e))?;

    fs::write(path, data).map_err(|e| StoreError::io(path, e))
}

fn to_indented_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new(
            dir.path().join("services.json"),
            dir.path().join("package.json"),
            dir.path().join("other").join("timestamps.json"),
        )
    }

    #[test]
    fn test_missing_cache_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load_cache().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(dir.path().join("other")).unwrap();
        fs::write(dir.path().join("other").join("timestamps.json"), "{not json").unwrap();
        assert!(matches!(store.load_cache(), Err(StoreError::Json { .. })));
    }

    #[test]
    fn test_save_cache_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let cache: FailureCache = [("rtmp://a.example.com/live".to_string(), 1_700_000_000)]
            .into_iter()
            .collect();

        store.save_cache(&cache).unwrap();

        let written = fs::read_to_string(dir.path().join("other").join("timestamps.json")).unwrap();
        assert_eq!(written, r#"{"rtmp://a.example.com/live":1700000000}"#);
        assert_eq!(store.load_cache().unwrap(), cache);
    }

    #[test]
    fn test_missing_catalog_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(matches!(store.load_catalog(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_badly_shaped_catalog_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            dir.path().join("services.json"),
            r#"{"services": [{"servers": [{"url": "rtmp://a.example.com/live"}]}]}"#,
        )
        .unwrap();

        match store.load_catalog() {
            Err(StoreError::Json { source, .. }) => {
                assert!(source.to_string().contains("missing a string \"name\""), "{}", source)
            }
            other => panic!("expected a json error, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_written_with_four_space_indent_and_literal_unicode() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            dir.path().join("services.json"),
            r#"{"format_version": 5, "services": [{"name": "Twitch 中文", "servers": [{"name": "Auto", "url": "rtmp://live.example.com/app"}]}]}"#,
        )
        .unwrap();

        let catalog = store.load_catalog().unwrap();
        store.save_catalog(&catalog).unwrap();

        let written = fs::read_to_string(dir.path().join("services.json")).unwrap();
        let expected = r#"{
    "format_version": 5,
    "services": [
        {
            "name": "Twitch 中文",
            "servers": [
                {
                    "name": "Auto",
                    "url": "rtmp://live.example.com/app"
                }
            ]
        }
    ]
}"#;
        assert_eq!(written, expected);
    }

    #[test]
    fn test_package_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            dir.path().join("package.json"),
            r#"{"url": "https://example.com/v5", "version": 7, "files": [{"name": "services.json", "version": 7}]}"#,
        )
        .unwrap();

        let mut package = store.load_package().unwrap();
        package.bump_version();
        store.save_package(&package).unwrap();

        let reloaded = store.load_package().unwrap();
        assert_eq!(reloaded.version, 8);
        assert_eq!(reloaded.files[0].version, 8);
    }
}
