/// Composite liveness of the backing stores
///
/// Each probe is a cheap round-trip. Probe errors and timeouts are folded
/// into `false`; a check never fails.

use crate::{account::AccountStore, error::AuthnResult, metrics, token::RefreshTokenStore};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health status response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub http: bool,
    pub db: bool,
    pub redis: bool,
}

pub struct HealthAggregator {
    accounts: AccountStore,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl HealthAggregator {
    pub fn new(accounts: AccountStore, refresh_tokens: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            accounts,
            refresh_tokens,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let start = Instant::now();

        let (db, redis) = tokio::join!(
            probe("db", self.accounts.ping()),
            probe("redis", self.refresh_tokens.ping()),
        );

        tracing::debug!(
            db,
            redis,
            duration_ms = start.elapsed().as_millis() as u64,
            "health_check_completed"
        );

        HealthReport {
            // Answering at all means the HTTP layer is up
            http: true,
            db,
            redis,
        }
    }
}

async fn probe<F>(backend: &str, check: F) -> bool
where
    F: Future<Output = AuthnResult<()>>,
{
    match tokio::time::timeout(PROBE_TIMEOUT, check).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(backend, error = %e, "health probe failed");
            metrics::record_probe_failure(backend);
            false
        }
        Err(_) => {
            tracing::warn!(backend, "health probe timed out");
            metrics::record_probe_failure(backend);
            false
        }
    }
}
