//! Shared key-value store abstraction.
//!
//! Every coordination primitive persists through this trait. Key namespaces
//! in use:
//!
//! ```text
//! rate_limit:{policy}:{id}              → sorted set of event timestamps
//! duplicate_check:{actor}:{fingerprint} → presence marker, short TTL
//! user_context:{actor}                  → capped turn list, JSON
//! qa_cache:* and other cache keys       → JSON values with TTL
//! stats:* / transfer_queue_count        → integer counters
//! ```
//!
//! Values are opaque strings to the store; structured records go through the
//! JSON helpers on [`KeyValueStoreExt`].

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;
pub use crate::utils::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// One step of an atomic per-key batch. The batch executes as an indivisible
/// unit against a single key's sorted set, which is what makes the sliding
/// window check race-free.
#[derive(Debug, Clone)]
pub enum PipelineOp<'a> {
    /// Drop all members whose score falls inside `[min, max]`.
    RemoveRangeByScore { min: f64, max: f64 },
    /// Add (or re-score) a member.
    AddMember { score: f64, member: &'a str },
    /// Cardinality of the set after the preceding steps.
    Count,
    /// Refresh the key's TTL.
    Expire { ttl: Duration },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Returns whether the key was present.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Atomic counter increment; the key is created at zero when absent.
    async fn increment(&self, key: &str, delta: i64) -> StoreResult<i64>;

    /// All live keys matching a glob pattern. Full scan, O(total keys);
    /// administrative paths only.
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    async fn ping(&self) -> StoreResult<()>;

    /// Execute `ops` atomically against `key`, returning one integer reply
    /// per op in order.
    async fn pipeline(&self, key: &str, ops: &[PipelineOp<'_>]) -> StoreResult<Vec<i64>>;
}

/// JSON round-trip helpers layered over the opaque string contract.
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    async fn get_json<T>(&self, key: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> StoreResult<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}
