//! Request-coordination layer for a webhook-driven conversational agent.
//!
//! An inbound messaging platform posts short text events; this crate decides,
//! per event, whether to admit it (sliding-window rate limits), whether it is
//! a rapid resend (duplicate suppression), what conversational grounding to
//! hand the response pipeline (bounded per-actor transcript), and how to
//! degrade when the pipeline or the shared store misbehaves (hard timeout,
//! fallback reply, fail-open store access).
//!
//! The webhook parsing, the LLM call, order lookup, human handoff and
//! knowledge-base CRUD are external collaborators: they consume the
//! primitives exposed here ([`coordination::SlidingWindowLimiter`],
//! [`coordination::ResponseCache`], [`coordination::DuplicateSuppressor`])
//! and sit behind the [`ResponsePipeline`] seam.

pub mod config;
pub mod coordination;
pub mod logging;
pub mod models;
pub mod store;
pub mod utils;

pub use config::Settings;
pub use coordination::{
    AdmissionDecision, CoordinatorStats, RequestCoordinator, ResponsePipeline,
};
pub use models::{ChatTurn, EventKind, InboundEvent, TurnRole};
pub use store::{KeyValueStore, MemoryStore, RedisStore};
pub use utils::error::{CoordinationError, StoreError};
