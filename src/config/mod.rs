pub mod settings;

pub use settings::{
    CacheConfig, ContextConfig, DuplicateConfig, LimitsConfig, MessagesConfig, PipelineConfig,
    RatePolicyConfig, Settings, StoreConfig,
};
