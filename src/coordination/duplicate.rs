use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::store::{KeyValueStore, StoreResult};
use crate::utils::content_fingerprint;

/// Collapses retransmits and rapid repeats of the same content from the same
/// actor inside a short window.
///
/// This is a single-shot guard, not a log: once the marker's TTL elapses no
/// history of the sighting remains.
pub struct DuplicateSuppressor {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl DuplicateSuppressor {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// True if this actor already sent identical content within the TTL.
    /// First sighting plants the marker and returns false; a repeat does not
    /// extend the marker's TTL. Store failure counts as a first sighting.
    pub async fn check_and_mark(&self, actor_id: &str, content: &str) -> bool {
        let key = format!(
            "duplicate_check:{actor_id}:{}",
            content_fingerprint(content)
        );
        match self.probe(&key).await {
            Ok(duplicate) => duplicate,
            Err(err) => {
                warn!(actor_id, error = %err, "duplicate check failed, treating as first sighting");
                false
            }
        }
    }

    async fn probe(&self, key: &str) -> StoreResult<bool> {
        if self.store.exists(key).await? {
            return Ok(true);
        }
        self.store.set(key, "1", Some(self.ttl)).await?;
        Ok(false)
    }
}
