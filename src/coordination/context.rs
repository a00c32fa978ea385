use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ContextConfig;
use crate::models::{ChatTurn, TurnRole};
use crate::store::{KeyValueStore, KeyValueStoreExt};
use crate::utils::error::CoordinationError;

/// Stored transcript record at `user_context:{actor}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ContextRecord {
    #[serde(default)]
    messages: Vec<ChatTurn>,
    #[serde(default)]
    last_update: i64,
}

/// Capped rolling transcript per actor, used as conversational grounding.
///
/// Append is a load-mutate-store sequence, not an atomic pipeline: it is not
/// race-free under concurrent writers to the same actor key. The coordinator
/// orders all steps for one actor, which is what makes this safe in the
/// intended deployment.
pub struct ConversationStore {
    store: Arc<dyn KeyValueStore>,
    max_turns: usize,
    ttl: std::time::Duration,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn KeyValueStore>, cfg: &ContextConfig) -> Self {
        Self {
            store,
            max_turns: cfg.max_turns,
            ttl: cfg.ttl(),
        }
    }

    fn key(actor_id: &str) -> String {
        format!("user_context:{actor_id}")
    }

    /// Ordered transcript for the actor; empty on absence, expiry, or a store
    /// failure (the conversation continues ungrounded rather than failing).
    pub async fn get(&self, actor_id: &str) -> Vec<ChatTurn> {
        match self.store.get_json::<ContextRecord>(&Self::key(actor_id)).await {
            Ok(Some(record)) => record.messages,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(actor_id, error = %err, "context load failed, starting empty");
                Vec::new()
            }
        }
    }

    pub async fn append(
        &self,
        actor_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<(), CoordinationError> {
        self.append_turns(actor_id, vec![ChatTurn { role, content: text.to_string() }])
            .await
    }

    /// Record one user message and the reply it produced, in order.
    pub async fn append_exchange(
        &self,
        actor_id: &str,
        user_text: &str,
        reply: &str,
    ) -> Result<(), CoordinationError> {
        self.append_turns(
            actor_id,
            vec![ChatTurn::user(user_text), ChatTurn::assistant(reply)],
        )
        .await
    }

    async fn append_turns(
        &self,
        actor_id: &str,
        turns: Vec<ChatTurn>,
    ) -> Result<(), CoordinationError> {
        let key = Self::key(actor_id);
        let mut record = self
            .store
            .get_json::<ContextRecord>(&key)
            .await?
            .unwrap_or_default();

        record.messages.extend(turns);
        // hard cap, oldest-first eviction
        if record.messages.len() > self.max_turns {
            let excess = record.messages.len() - self.max_turns;
            record.messages.drain(..excess);
        }
        record.last_update = Utc::now().timestamp();

        self.store.set_json(&key, &record, Some(self.ttl)).await?;
        Ok(())
    }

    /// Explicit reset, e.g. when a human agent takes over the session.
    pub async fn reset(&self, actor_id: &str) -> Result<bool, CoordinationError> {
        Ok(self.store.delete(&Self::key(actor_id)).await?)
    }
}
