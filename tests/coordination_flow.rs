//! End-to-end flow over the in-memory store: admission, duplicate
//! suppression, cached generation, context accumulation, stats.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use chat_coordinator::config::RatePolicyConfig;
use chat_coordinator::coordination::ResponseCache;
use chat_coordinator::store::{PipelineOp, StoreResult};
use chat_coordinator::utils::content_fingerprint;
use chat_coordinator::{
    ChatTurn, CoordinationError, InboundEvent, KeyValueStore, MemoryStore, RequestCoordinator,
    ResponsePipeline, Settings, StoreError,
};

/// Pipeline double that memoizes answers through [`ResponseCache`], the way
/// the production QA pipeline caches LLM replies.
struct CachingPipeline {
    cache: ResponseCache,
    generations: AtomicUsize,
}

impl CachingPipeline {
    fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            cache: ResponseCache::new(store, Duration::from_secs(3600)),
            generations: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResponsePipeline for CachingPipeline {
    async fn generate(
        &self,
        text: &str,
        _context: &[ChatTurn],
    ) -> Result<String, CoordinationError> {
        let key = format!("qa_cache:{}", content_fingerprint(text));
        self.cache
            .get_or_compute(&key, None, || async {
                self.generations.fetch_add(1, Ordering::SeqCst);
                Ok(format!("answer: {text}"))
            })
            .await
    }
}

/// Store whose every operation fails, standing in for an unreachable redis.
struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    async fn set(&self, _: &str, _: &str, _: Option<Duration>) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _: &str) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn exists(&self, _: &str) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn increment(&self, _: &str, _: i64) -> StoreResult<i64> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn keys(&self, _: &str) -> StoreResult<Vec<String>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn pipeline(&self, _: &str, _: &[PipelineOp<'_>]) -> StoreResult<Vec<i64>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.pipeline.generate_timeout_seconds = 1;
    settings
}

#[tokio::test]
async fn identical_questions_share_one_generation() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(CachingPipeline::new(store.clone()));
    let coord = RequestCoordinator::new(&settings(), store, pipeline.clone());

    let a = coord
        .handle(&InboundEvent::text("alice", "what are your opening hours?"))
        .await
        .unwrap();
    // a different actor asking the same thing dodges the duplicate guard but
    // hits the shared answer cache
    let b = coord
        .handle(&InboundEvent::text("bob", "what are your opening hours?"))
        .await
        .unwrap();

    assert_eq!(a, "answer: what are your opening hours?");
    assert_eq!(a, b);
    assert_eq!(pipeline.generations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rapid_resend_is_suppressed_then_accepted_after_ttl() {
    let mut settings = settings();
    settings.duplicate.ttl_seconds = 1;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(CachingPipeline::new(store.clone()));
    let coord = RequestCoordinator::new(&settings, store, pipeline);

    let first = coord
        .handle(&InboundEvent::text("u1", "hi"))
        .await
        .unwrap();
    assert_eq!(first, "answer: hi");

    let resend = coord
        .handle(&InboundEvent::text("u1", "hi"))
        .await
        .unwrap();
    assert_eq!(resend, settings.messages.duplicate);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let after = coord
        .handle(&InboundEvent::text("u1", "hi"))
        .await
        .unwrap();
    assert_eq!(after, "answer: hi");
}

#[tokio::test]
async fn third_message_in_window_is_rejected() {
    let mut settings = settings();
    settings.limits.user = RatePolicyConfig { limit: 2, window_seconds: 60 };

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(CachingPipeline::new(store.clone()));
    let coord = RequestCoordinator::new(&settings, store, pipeline);

    let replies = [
        coord.handle(&InboundEvent::text("u42", "one")).await.unwrap(),
        coord.handle(&InboundEvent::text("u42", "two")).await.unwrap(),
        coord.handle(&InboundEvent::text("u42", "three")).await.unwrap(),
    ];

    assert_eq!(replies[0], "answer: one");
    assert_eq!(replies[1], "answer: two");
    assert_eq!(replies[2], settings.messages.rate_limited);

    // other actors are unaffected
    let other = coord.handle(&InboundEvent::text("u43", "one")).await.unwrap();
    assert_eq!(other, "answer: one");
}

#[tokio::test]
async fn unreachable_store_never_blocks_the_flow() {
    let store: Arc<dyn KeyValueStore> = Arc::new(DownStore);
    let pipeline = Arc::new(CachingPipeline::new(store.clone()));
    let coord = RequestCoordinator::new(&settings(), store, pipeline.clone());

    // every attempt is admitted, nothing is cached, every call generates
    for _ in 0..3 {
        let reply = coord
            .handle(&InboundEvent::text("u1", "hello"))
            .await
            .unwrap();
        assert_eq!(reply, "answer: hello");
    }
    assert_eq!(pipeline.generations.load(Ordering::SeqCst), 3);

    let stats = coord.stats().await;
    assert!(!stats.store_healthy);
}

#[tokio::test]
async fn stats_reflect_the_traffic_mix() {
    let mut settings = settings();
    settings.limits.user = RatePolicyConfig { limit: 3, window_seconds: 60 };

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(CachingPipeline::new(store.clone()));
    let coord = RequestCoordinator::new(&settings, store, pipeline);

    let _ = coord.handle(&InboundEvent::text("u1", "q1")).await;
    let _ = coord.handle(&InboundEvent::text("u1", "q1")).await; // duplicate
    let _ = coord.handle(&InboundEvent::text("u1", "q2")).await;
    let _ = coord.handle(&InboundEvent::text("u1", "q3")).await; // 4th in window: limited

    let stats = coord.stats().await;
    assert_eq!(stats.usage.total_requests, 4);
    assert_eq!(stats.usage.completed, 2);
    assert_eq!(stats.usage.duplicates, 1);
    assert_eq!(stats.usage.rate_limited, 1);
    assert!(stats.store_healthy);
}

#[tokio::test]
async fn detached_dispatch_returns_the_reply() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(CachingPipeline::new(store.clone()));
    let coord = Arc::new(RequestCoordinator::new(&settings(), store, pipeline));

    let handle = coord.spawn_handle(InboundEvent::text("u1", "hello"));
    let reply = handle.await.unwrap().unwrap();
    assert_eq!(reply, "answer: hello");
}
