//! Reconciliation of probe results against the failure cache.
//!
//! Nothing here touches the network or the filesystem.

use crate::catalog::{FailureCache, Server, Service};

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Clock and threshold for one check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgePolicy {
    /// Run start, in epoch seconds.
    pub now: i64,
    /// Minimum failure age before a server is purged, in seconds.
    pub purge_age_secs: i64,
}

/// What happened to a single server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerVerdict {
    /// Alive, and was not failing before.
    Healthy,
    /// First failure; its timestamp is now cached.
    NewFailure,
    /// Still failing, but not for long enough to purge.
    StillFailing { age_secs: i64 },
    /// Alive again after failing; removed from the cache.
    Recovered { age_secs: i64 },
    /// Failing for at least the purge age; dropped from the catalog.
    ///
    /// The cache entry stays, so every other service listing the same url
    /// purges it too.
    Purged { age_secs: i64 },
}

impl ServerVerdict {
    pub fn keeps_server(&self) -> bool {
        !matches!(self, Self::Purged { .. })
    }
}

/// Update the cache for one probe result and decide whether the server stays.
pub fn reconcile_server(
    url: &str,
    is_ok: bool,
    cache: &mut FailureCache,
    policy: &PurgePolicy,
) -> ServerVerdict {
    match (is_ok, cache.get(url)) {
        (false, Some(first_failure)) => {
            let age_secs = policy.now - first_failure;
            if age_secs >= policy.purge_age_secs {
                ServerVerdict::Purged { age_secs }
            } else {
                ServerVerdict::StillFailing { age_secs }
            }
        }
        (false, None) => {
            cache.record_failure(url, policy.now);
            ServerVerdict::NewFailure
        }
        (true, Some(first_failure)) => {
            let age_secs = policy.now - first_failure;
            cache.clear(url);
            ServerVerdict::Recovered { age_secs }
        }
        (true, None) => ServerVerdict::Healthy,
    }
}

/// Report a verdict the way the check run logs it.
pub fn log_verdict(url: &str, verdict: &ServerVerdict) {
    match verdict {
        ServerVerdict::Purged { age_secs } => tracing::info!(
            "🗑️ Purging server \"{}\", it has been unresponsive for {} days.",
            url,
            days(*age_secs)
        ),
        ServerVerdict::Recovered { age_secs } => {
            tracing::info!("💡 Server \"{}\" is back after {} days!", url, days(*age_secs))
        }
        ServerVerdict::StillFailing { age_secs } => {
            tracing::debug!("Server \"{}\" failing for {}s, not purging yet", url, age_secs)
        }
        ServerVerdict::NewFailure => tracing::debug!("Server \"{}\" failed for the first time", url),
        ServerVerdict::Healthy => {}
    }
}

/// Result of checking one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOutcome {
    /// The service to write back, or `None` if it has no servers left.
    pub service: Option<Service>,
    pub removed_servers: usize,
}

impl ServiceOutcome {
    /// Whether the catalog differs because of this service.
    pub fn changed(&self) -> bool {
        self.removed_servers > 0 || self.service.is_none()
    }
}

/// Build the service that remains after its servers were reconciled.
pub fn finish_service(service: &Service, kept: Vec<Server>) -> ServiceOutcome {
    let removed_servers = service.servers.len().saturating_sub(kept.len());
    if removed_servers > 0 {
        tracing::info!("ℹ️ Removed {} server(s) from {}", removed_servers, service.name);
    }

    if kept.is_empty() {
        tracing::info!(
            "💀 Service \"{}\" has no valid servers left, removing!",
            service.name
        );
        return ServiceOutcome {
            service: None,
            removed_servers,
        };
    }

    ServiceOutcome {
        service: Some(service.with_servers(kept)),
        removed_servers,
    }
}

fn days(secs: i64) -> i64 {
    (secs as f64 / SECONDS_PER_DAY).round_ties_even() as i64
}
