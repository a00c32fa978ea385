use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{MessagesConfig, Settings};
use crate::models::{EventKind, InboundEvent};
use crate::store::KeyValueStore;
use crate::utils::error::CoordinationError;

use super::cache::ResponseCache;
use super::context::ConversationStore;
use super::duplicate::DuplicateSuppressor;
use super::limiter::SlidingWindowLimiter;
use super::stats::{keys, CoordinatorStats, StatsRecorder};
use crate::models::ChatTurn;

/// Seam to the business pipeline: intent handling, knowledge lookup and the
/// LLM call live behind this trait, typically consulting [`ResponseCache`]
/// internally. Implementations may fail or exceed the deadline; the
/// coordinator maps both to the configured fallback reply.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResponsePipeline: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, CoordinationError>;

    /// Pre-load whatever the pipeline caches (knowledge base, canned
    /// answers). Called from the administrative boundary.
    async fn warm_up(&self) -> Result<(), CoordinationError> {
        Ok(())
    }
}

/// Single entry point of the coordination layer.
///
/// Per inbound message, in fixed order: admission check, duplicate
/// check-and-mark, pipeline delegation under a hard timeout, context update.
/// Steps for one actor are strictly ordered; events for different actors run
/// fully independently. Once limiter or duplicate state is committed it is
/// never rolled back, even when a later step fails.
pub struct RequestCoordinator {
    limiter: SlidingWindowLimiter,
    suppressor: DuplicateSuppressor,
    cache: ResponseCache,
    context: ConversationStore,
    stats: StatsRecorder,
    pipeline: Arc<dyn ResponsePipeline>,
    generate_timeout: Duration,
    max_reply_length: usize,
    messages: MessagesConfig,
}

impl RequestCoordinator {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn KeyValueStore>,
        pipeline: Arc<dyn ResponsePipeline>,
    ) -> Self {
        Self {
            limiter: SlidingWindowLimiter::new(store.clone(), settings.limits.clone()),
            suppressor: DuplicateSuppressor::new(store.clone(), settings.duplicate.ttl()),
            cache: ResponseCache::new(store.clone(), settings.cache.default_ttl()),
            context: ConversationStore::new(store.clone(), &settings.context),
            stats: StatsRecorder::new(store),
            pipeline,
            generate_timeout: settings.pipeline.generate_timeout(),
            max_reply_length: settings.pipeline.max_reply_length,
            messages: settings.messages.clone(),
        }
    }

    /// Handle one inbound event. `None` means the event was dropped without
    /// a reply (malformed or non-text); otherwise the returned text goes back
    /// to the actor.
    pub async fn handle(&self, event: &InboundEvent) -> Option<String> {
        let actor_id = event.actor_id.trim();
        let text = event.text.trim();
        if actor_id.is_empty() || text.is_empty() || event.kind != EventKind::Text {
            debug!(kind = ?event.kind, "dropping malformed or non-text event");
            return None;
        }
        self.stats.bump(keys::REQUESTS_TOTAL).await;

        let decision = self.limiter.admit_actor(actor_id).await;
        if !decision.allowed {
            warn!(
                actor_id,
                current = decision.current,
                limit = decision.limit,
                "actor rate limited"
            );
            self.stats.bump(keys::RATE_LIMITED).await;
            return Some(self.messages.rate_limited.clone());
        }

        if self.suppressor.check_and_mark(actor_id, text).await {
            info!(actor_id, "duplicate message suppressed");
            self.stats.bump(keys::DUPLICATES).await;
            return Some(self.messages.duplicate.clone());
        }

        let history = self.context.get(actor_id).await;
        let generated =
            tokio::time::timeout(self.generate_timeout, self.pipeline.generate(text, &history))
                .await;
        let reply = match generated {
            Ok(Ok(reply)) => self.clamp_reply(reply),
            Ok(Err(err)) => {
                error!(actor_id, error = %err, "pipeline failed, sending fallback");
                self.stats.bump(keys::FALLBACKS).await;
                return Some(self.messages.fallback.clone());
            }
            Err(_) => {
                error!(
                    actor_id,
                    timeout = ?self.generate_timeout,
                    "pipeline timed out, sending fallback"
                );
                self.stats.bump(keys::FALLBACKS).await;
                return Some(self.messages.fallback.clone());
            }
        };

        // Limiter and duplicate state stay committed even if this fails.
        if let Err(err) = self.context.append_exchange(actor_id, text, &reply).await {
            warn!(actor_id, error = %err, "context append failed");
        }
        self.stats.bump(keys::COMPLETED).await;
        Some(reply)
    }

    /// Dispatch one event on its own task. The webhook acknowledgment path
    /// must answer within a few seconds and cannot wait on the pipeline, so
    /// handling is fire-and-forget relative to the acknowledgment.
    pub fn spawn_handle(self: &Arc<Self>, event: InboundEvent) -> JoinHandle<Option<String>> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.handle(&event).await })
    }

    fn clamp_reply(&self, reply: String) -> String {
        if reply.chars().count() <= self.max_reply_length {
            return reply;
        }
        let keep = self
            .max_reply_length
            .saturating_sub(self.messages.truncation_notice.chars().count());
        let mut clamped: String = reply.chars().take(keep).collect();
        clamped.push_str(&self.messages.truncation_notice);
        clamped
    }

    // ===== ADMINISTRATIVE BOUNDARY =====

    /// The memoization layer handed to pipeline implementations.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Admission control for the ingestion boundary's ip/route checks.
    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Bulk cache flush by glob pattern.
    pub async fn invalidate(&self, pattern: &str) -> Result<usize, CoordinationError> {
        self.cache.invalidate_pattern(pattern).await
    }

    pub async fn warm_up(&self) -> Result<(), CoordinationError> {
        self.pipeline.warm_up().await
    }

    pub async fn stats(&self) -> CoordinatorStats {
        self.stats.snapshot().await
    }

    /// Count one session handed to a human agent; returns the queue depth.
    pub async fn record_transfer(&self) -> i64 {
        self.stats.record_transfer().await
    }

    pub async fn reset_context(&self, actor_id: &str) -> Result<bool, CoordinationError> {
        self.context.reset(actor_id).await
    }
}
