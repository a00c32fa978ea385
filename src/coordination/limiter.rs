use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::config::{LimitsConfig, RatePolicyConfig};
use crate::store::{KeyValueStore, PipelineOp};

/// Admission policy: at most `limit` events per trailing `window`.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub limit: u64,
    pub window: Duration,
}

impl From<RatePolicyConfig> for RatePolicy {
    fn from(cfg: RatePolicyConfig) -> Self {
        Self {
            limit: cfg.limit,
            window: Duration::from_secs(cfg.window_seconds),
        }
    }
}

/// Outcome of one admission check. Ephemeral, returned to the caller only.
#[derive(Debug, Clone)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Events currently in the window, the just-recorded one included.
    pub current: u64,
    pub limit: u64,
    pub window_secs: u64,
    pub remaining: u64,
    /// Unix timestamp at which a fully saturated window would drain.
    pub reset_at: i64,
}

/// Sliding-window admission over a per-key sorted set of event timestamps.
///
/// The window slides continuously, so there is no burst-at-boundary abuse the
/// way a fixed-window counter allows.
pub struct SlidingWindowLimiter {
    store: Arc<dyn KeyValueStore>,
    policies: LimitsConfig,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, policies: LimitsConfig) -> Self {
        Self { store, policies }
    }

    /// One atomic batch per check: trim aged timestamps, record the current
    /// one, count, refresh the key TTL.
    ///
    /// The current event is inserted before counting, so the Nth event in the
    /// window is the last one admitted and a rejected event still occupies a
    /// slot until it ages out. Known behavior, kept on purpose; do not
    /// reorder the batch.
    ///
    /// A store failure logs and admits: availability of the chat flow wins
    /// over strict enforcement.
    pub async fn check(&self, key: &str, policy: RatePolicy) -> AdmissionDecision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let now_secs = now.as_secs_f64();
        let window_start = now_secs - policy.window.as_secs_f64();
        let reset_at = now.as_secs() as i64 + policy.window.as_secs() as i64;

        let record_key = format!("rate_limit:{key}");
        // Microsecond members keep same-second events distinct in the set.
        let member = now.as_micros().to_string();
        let ops = [
            PipelineOp::RemoveRangeByScore { min: 0.0, max: window_start },
            PipelineOp::AddMember { score: now_secs, member: &member },
            PipelineOp::Count,
            PipelineOp::Expire { ttl: policy.window },
        ];

        match self.store.pipeline(&record_key, &ops).await {
            Ok(replies) => {
                let current = replies.get(2).copied().unwrap_or(0).max(0) as u64;
                let allowed = current <= policy.limit;
                if !allowed {
                    debug!(key, current, limit = policy.limit, "admission denied");
                }
                AdmissionDecision {
                    allowed,
                    current,
                    limit: policy.limit,
                    window_secs: policy.window.as_secs(),
                    remaining: policy.limit.saturating_sub(current),
                    reset_at,
                }
            }
            Err(err) => {
                warn!(key, error = %err, "admission check failed, allowing request");
                AdmissionDecision {
                    allowed: true,
                    current: 0,
                    limit: policy.limit,
                    window_secs: policy.window.as_secs(),
                    remaining: policy.limit,
                    reset_at,
                }
            }
        }
    }

    // ===== NAMED POLICIES =====
    // Independent key namespaces; tripping one says nothing about the others.

    pub async fn admit_actor(&self, actor_id: &str) -> AdmissionDecision {
        self.check(&format!("user:{actor_id}"), self.policies.user.into())
            .await
    }

    pub async fn admit_origin(&self, addr: &str) -> AdmissionDecision {
        self.check(&format!("ip:{addr}"), self.policies.ip.into())
            .await
    }

    pub async fn admit_route(&self, route: &str) -> AdmissionDecision {
        self.check(&format!("api:{route}"), self.policies.api.into())
            .await
    }

    pub async fn admit(&self, key: &str) -> AdmissionDecision {
        self.check(key, self.policies.default.into()).await
    }
}
