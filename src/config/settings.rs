use std::time::Duration;

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Every tunable of the coordination layer in one place, validated once at
/// startup. Defaults mirror the production deployment; a `config/settings`
/// file and `APP__`-prefixed environment variables override them.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub limits: LimitsConfig,
    pub duplicate: DuplicateConfig,
    pub cache: CacheConfig,
    pub context: ContextConfig,
    pub pipeline: PipelineConfig,
    pub messages: MessagesConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct RatePolicyConfig {
    pub limit: u64,
    pub window_seconds: u64,
}

/// Per-namespace admission policies. Each one is an independent key space;
/// tripping the ip limit says nothing about the user limit.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub default: RatePolicyConfig,
    pub user: RatePolicyConfig,
    pub ip: RatePolicyConfig,
    pub api: RatePolicyConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default: RatePolicyConfig { limit: 60, window_seconds: 60 },
            user: RatePolicyConfig { limit: 30, window_seconds: 60 },
            ip: RatePolicyConfig { limit: 100, window_seconds: 60 },
            api: RatePolicyConfig { limit: 1000, window_seconds: 60 },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DuplicateConfig {
    pub ttl_seconds: u64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self { ttl_seconds: 5 }
    }
}

impl DuplicateConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { default_ttl_seconds: 3600 }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard cap on stored turns (20 = 10 user+assistant exchanges).
    pub max_turns: usize,
    pub ttl_seconds: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_turns: 20, ttl_seconds: 3600 }
    }
}

impl ContextConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard deadline on response generation before the fallback reply goes out.
    pub generate_timeout_seconds: u64,
    pub max_reply_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generate_timeout_seconds: 3,
            max_reply_length: 2000,
        }
    }
}

impl PipelineConfig {
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_seconds)
    }
}

/// User-facing reply strings. Kept in config so operators can localize them
/// without a rebuild.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MessagesConfig {
    pub rate_limited: String,
    pub duplicate: String,
    pub fallback: String,
    pub truncation_notice: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            rate_limited: "You're sending messages too quickly. Please wait a moment and try again."
                .to_string(),
            duplicate: "Please don't resend the same message.".to_string(),
            fallback:
                "Sorry, the system is busy right now. Please try again shortly or type 'agent' to reach a human."
                    .to_string(),
            truncation_notice:
                "...\n\nThe full answer was longer. Ask a follow-up or type 'agent' for more detail."
                    .to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, policy) in [
            ("default", &self.limits.default),
            ("user", &self.limits.user),
            ("ip", &self.limits.ip),
            ("api", &self.limits.api),
        ] {
            if policy.limit == 0 {
                bail!("limits.{name}.limit must be at least 1");
            }
            if policy.window_seconds == 0 {
                bail!("limits.{name}.window_seconds must be at least 1");
            }
        }
        if self.duplicate.ttl_seconds == 0 {
            bail!("duplicate.ttl_seconds must be at least 1");
        }
        if self.context.max_turns == 0 {
            bail!("context.max_turns must be at least 1");
        }
        if self.pipeline.generate_timeout_seconds == 0 {
            bail!("pipeline.generate_timeout_seconds must be at least 1");
        }
        if self.pipeline.max_reply_length < self.messages.truncation_notice.chars().count() {
            bail!("pipeline.max_reply_length shorter than the truncation notice");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.limits.user.limit, 30);
        assert_eq!(settings.duplicate.ttl_seconds, 5);
        assert_eq!(settings.context.max_turns, 20);
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut settings = Settings::default();
        settings.limits.user.window_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_cap_is_rejected() {
        let mut settings = Settings::default();
        settings.context.max_turns = 0;
        assert!(settings.validate().is_err());
    }
}
