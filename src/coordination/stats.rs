use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Counter keys. `transfer_queue_count` is shared with the human-handoff
/// service, which pushes sessions onto the queue.
pub(crate) mod keys {
    pub const REQUESTS_TOTAL: &str = "stats:requests_total";
    pub const RATE_LIMITED: &str = "stats:rate_limited";
    pub const DUPLICATES: &str = "stats:duplicates";
    pub const FALLBACKS: &str = "stats:fallbacks";
    pub const COMPLETED: &str = "stats:completed";
    pub const TRANSFER_QUEUE: &str = "transfer_queue_count";
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageCounters {
    pub total_requests: i64,
    pub rate_limited: i64,
    pub duplicates: i64,
    pub fallbacks: i64,
    pub completed: i64,
}

/// Operational snapshot for the administrative boundary. Read-only; no core
/// invariant depends on how often this is taken.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub usage: UsageCounters,
    pub transfer_queue_depth: i64,
    pub store_healthy: bool,
}

/// Best-effort usage accounting. A failed bump is logged at debug and
/// forgotten; stats must never slow down or block the chat flow.
pub struct StatsRecorder {
    store: Arc<dyn KeyValueStore>,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub(crate) async fn bump(&self, key: &str) {
        if let Err(err) = self.store.increment(key, 1).await {
            debug!(key, error = %err, "stats increment failed");
        }
    }

    /// Count one session handed to a human agent.
    pub async fn record_transfer(&self) -> i64 {
        match self.store.increment(keys::TRANSFER_QUEUE, 1).await {
            Ok(depth) => depth,
            Err(err) => {
                warn!(error = %err, "transfer counter increment failed");
                0
            }
        }
    }

    async fn read_counter(&self, key: &str) -> i64 {
        match self.store.get(key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub async fn snapshot(&self) -> CoordinatorStats {
        let usage = UsageCounters {
            total_requests: self.read_counter(keys::REQUESTS_TOTAL).await,
            rate_limited: self.read_counter(keys::RATE_LIMITED).await,
            duplicates: self.read_counter(keys::DUPLICATES).await,
            fallbacks: self.read_counter(keys::FALLBACKS).await,
            completed: self.read_counter(keys::COMPLETED).await,
        };
        let transfer_queue_depth = self.read_counter(keys::TRANSFER_QUEUE).await;
        let store_healthy = self.store.ping().await.is_ok();
        CoordinatorStats {
            usage,
            transfer_queue_depth,
            store_healthy,
        }
    }
}
