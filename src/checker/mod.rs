//! Checker module: probes every server in the catalog and prunes dead ones.

mod reconcile;

pub use reconcile::*;

use crate::catalog::{Catalog, FailureCache, FileStore, OutputKind, StoreError};
use crate::config::CheckerConfig;
use crate::probe::{Liveness, NetworkProber, ProbeError};

use chrono::Utc;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that abort a check run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to set up probes: {0}")]
    Probe(#[from] ProbeError),
}

/// The catalog and cache after one pass over all services.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub catalog: Catalog,
    pub cache: FailureCache,
    /// At least one server or service was removed.
    pub changed: bool,
}

/// Probe every server of every service in order and reconcile the results.
///
/// Skipped services and services with an unknown output type are copied
/// through untouched.
pub async fn check_catalog<L: Liveness>(
    catalog: &Catalog,
    cache: FailureCache,
    liveness: &L,
    skipped_services: &BTreeSet<String>,
    policy: &PurgePolicy,
) -> RunOutcome {
    let mut cache = cache;
    let mut changed = false;
    let mut services = Vec::with_capacity(catalog.services.len());

    for service in &catalog.services {
        if skipped_services.contains(&service.name) {
            services.push(service.clone());
            continue;
        }

        let kind = service.output_kind();
        if let OutputKind::Unknown(raw) = &kind {
            tracing::info!("Unknown service type: {}", raw);
            services.push(service.clone());
            continue;
        }

        let mut kept = Vec::with_capacity(service.servers.len());
        for server in &service.servers {
            let is_ok = liveness.is_alive(&kind, &server.url).await;
            let verdict = reconcile_server(&server.url, is_ok, &mut cache, policy);
            log_verdict(&server.url, &verdict);
            if verdict.keeps_server() {
                kept.push(server.clone());
            }
        }

        let outcome = finish_service(service, kept);
        changed |= outcome.changed();
        services.extend(outcome.service);
    }

    RunOutcome {
        catalog: catalog.with_services(services),
        cache,
        changed,
    }
}

/// Run a full check with network probes, starting the clock now.
pub async fn run(config: &CheckerConfig) -> Result<bool, RunError> {
    let prober = NetworkProber::new(config.timeout)?;
    run_with(config, &prober, Utc::now().timestamp()).await
}

/// Load, check and persist. Returns whether the catalog was rewritten.
pub async fn run_with<L: Liveness>(
    config: &CheckerConfig,
    liveness: &L,
    now: i64,
) -> Result<bool, RunError> {
    let store = FileStore::new(
        &config.services_path,
        &config.package_path,
        &config.cache_path,
    );

    let catalog = store.load_catalog()?;
    let mut package = store.load_package()?;
    let cache = match store.load_cache() {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!("⚠️ Could not read cache file, starting empty: {}", e);
            FailureCache::new()
        }
    };

    tracing::info!("Checking {} services", catalog.services.len());
    if !cache.is_empty() {
        tracing::info!("{} servers were failing on the previous run", cache.len());
    }

    let policy = PurgePolicy {
        now,
        purge_age_secs: config.purge_age_secs,
    };
    let outcome = check_catalog(&catalog, cache, liveness, &config.skipped_services, &policy).await;

    tracing::info!("Writing cache file");
    let cache_written = store.save_cache(&outcome.cache);
    if let Err(e) = &cache_written {
        tracing::error!("❌ Failed to write cache file: {}", e);
    }

    if outcome.changed {
        tracing::info!("Writing new services/package file.");
        package.bump_version();
        store.save_catalog(&outcome.catalog)?;
        store.save_package(&package)?;
    }

    cache_written?;
    Ok(outcome.changed)
}
