use std::sync::Arc;

use tracing::{error, info};

use courier_store::Registry;
use courier_types::outcome::BroadcastReport;

use crate::transport::Transport;

/// Fans one operator message out to every active user, isolating
/// per-recipient failures.
pub struct BroadcastDispatcher {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<Registry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Attempt delivery to every active user in registry order. A failure
    /// for one recipient never aborts, skips or retries the rest.
    ///
    /// Broadcast content is not appended to per-user timelines — only the
    /// 1:1 reply path writes to the ledger.
    pub async fn broadcast(&self, text: &str) -> BroadcastReport {
        let mut delivered = 0;
        let mut failed = 0;

        for user in self.registry.list_active_users().await {
            match self.transport.deliver(user.id, text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    error!("Failed to send broadcast to user {}: {}", user.id, e);
                }
            }
        }

        info!("Broadcast complete: {} delivered, {} failed", delivered, failed);
        BroadcastReport { delivered, failed }
    }
}
