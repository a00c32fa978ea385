use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::info;

use super::{KeyValueStore, PipelineOp, StoreError, StoreResult};

/// Store backed by a process-external redis instance.
///
/// `ConnectionManager` reconnects transparently; command failures surface as
/// [`StoreError::Unavailable`] and callers in the coordination layer fail
/// open on them. Nothing here panics on a dead connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(StoreError::from)?;
        let conn = ConnectionManager::new(client).await?;
        let store = Self { conn };
        store.ping().await?;
        info!("redis store connected");
        Ok(store)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let present: bool = conn.exists(key).await?;
        Ok(present)
    }

    async fn increment(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, delta).await?;
        Ok(value)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn pipeline(&self, key: &str, ops: &[PipelineOp<'_>]) -> StoreResult<Vec<i64>> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            match op {
                PipelineOp::RemoveRangeByScore { min, max } => {
                    pipe.zrembyscore(key, *min, *max);
                }
                PipelineOp::AddMember { score, member } => {
                    pipe.zadd(key, *member, *score);
                }
                PipelineOp::Count => {
                    pipe.zcard(key);
                }
                PipelineOp::Expire { ttl } => {
                    pipe.expire(key, ttl.as_secs().max(1) as i64);
                }
            }
        }
        let replies: Vec<i64> = pipe.query_async(&mut conn).await?;
        Ok(replies)
    }
}
