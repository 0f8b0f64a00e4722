//! Revocation Sweep
//!
//! Periodic purge of revocation entries past their expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::domain::repository::RevokedTokenRepository;
use crate::error::AuthResult;

/// Delete every entry that has already expired
pub async fn purge_once<T>(revocations: &T) -> AuthResult<u64>
where
    T: RevokedTokenRepository,
{
    let purged = revocations.purge_expired(Utc::now()).await?;
    if purged > 0 {
        tracing::info!(purged, "Purged expired revoked tokens");
    }
    Ok(purged)
}

/// Run `purge_once` every `every`, starting one period from now
///
/// A failed tick is logged; the next tick runs regardless.
pub fn spawn_revocation_sweep<T>(revocations: Arc<T>, every: Duration) -> JoinHandle<()>
where
    T: RevokedTokenRepository + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = purge_once(revocations.as_ref()).await {
                tracing::warn!(error = %e, "Revoked token sweep failed");
            }
        }
    })
}
