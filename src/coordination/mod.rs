//! The request-coordination core: sliding-window admission, duplicate
//! suppression, cache-or-compute, the bounded conversation transcript, and
//! the coordinator composing them.
//!
//! Everything is constructed once from [`crate::config::Settings`] plus an
//! `Arc<dyn KeyValueStore>` and injected; there are no module-level
//! singletons.

pub mod cache;
pub mod context;
pub mod coordinator;
pub mod duplicate;
pub mod limiter;
pub mod stats;

pub use cache::ResponseCache;
pub use context::ConversationStore;
pub use coordinator::{RequestCoordinator, ResponsePipeline};
pub use duplicate::DuplicateSuppressor;
pub use limiter::{AdmissionDecision, RatePolicy, SlidingWindowLimiter};
pub use stats::{CoordinatorStats, StatsRecorder, UsageCounters};
