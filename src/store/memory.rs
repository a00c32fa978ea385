use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{KeyValueStore, PipelineOp, StoreError, StoreResult};

/// In-process store with the same contract as the redis-backed one.
///
/// Serves as the fake store for tests and as a single-node deployment option.
/// Expired entries are removed lazily on access. Pipelines are atomic per key
/// because the whole batch runs while holding the key's map entry.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    windows: DashMap<String, Window>,
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
struct Window {
    // (score, member), kept ordered by score
    members: Vec<(f64, String)>,
    expires_at: Option<Instant>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let had_entry = self.entries.remove(key).is_some();
        let had_window = self.windows.remove(key).is_some();
        Ok(had_entry || had_window)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn increment(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        if entry.is_expired() {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }
        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| StoreError::Protocol(format!("non-numeric value at {key}")))?;
        let next = current + delta;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|r| !r.value().is_expired() && glob_match(pattern, r.key()))
            .map(|r| r.key().clone())
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn pipeline(&self, key: &str, ops: &[PipelineOp<'_>]) -> StoreResult<Vec<i64>> {
        let mut win = self.windows.entry(key.to_string()).or_default();
        if win.expires_at.is_some_and(|at| Instant::now() >= at) {
            win.members.clear();
            win.expires_at = None;
        }
        let mut replies = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                PipelineOp::RemoveRangeByScore { min, max } => {
                    let before = win.members.len();
                    win.members.retain(|(score, _)| *score < *min || *score > *max);
                    replies.push((before - win.members.len()) as i64);
                }
                PipelineOp::AddMember { score, member } => {
                    let added = if let Some(pos) =
                        win.members.iter().position(|(_, m)| m.as_str() == *member)
                    {
                        win.members[pos].0 = *score;
                        0
                    } else {
                        win.members.push((*score, member.to_string()));
                        1
                    };
                    win.members.sort_by(|a, b| a.0.total_cmp(&b.0));
                    replies.push(added);
                }
                PipelineOp::Count => {
                    replies.push(win.members.len() as i64);
                }
                PipelineOp::Expire { ttl } => {
                    win.expires_at = Some(Instant::now() + *ttl);
                    replies.push(1);
                }
            }
        }
        Ok(replies)
    }
}

/// Minimal glob: `*` matches any run of characters. This is the only wildcard
/// the admin flush paths use.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}
