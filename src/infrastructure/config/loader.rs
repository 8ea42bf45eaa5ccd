use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project configuration file
pub const CONFIG_FILE: &str = "cbr-agents.yaml";

/// Optional local overrides, kept out of version control
pub const LOCAL_CONFIG_FILE: &str = "cbr-agents.local.yaml";

/// Prefix for structured environment overrides (`CBR_AGENTS_RETRY__MAX_ATTEMPTS=5`)
pub const ENV_PREFIX: &str = "CBR_AGENTS_";

/// Environment variable names used by earlier deployments, with the config key they set
pub const LEGACY_ENV_VARS: [(&str, &str); 6] = [
    ("AZURE_AI_FOUNDRY_ENDPOINT", "foundry.endpoint"),
    ("AZURE_AI_FOUNDRY_KEY", "foundry.auth.api_key"),
    ("ORCHESTRATOR_AGENT_ID", "agents.orchestrator.id"),
    ("AGENT1_ID", "agents.search.id"),
    ("AGENT2_ID", "agents.booking.id"),
    ("AZURE_OPENAI_DEPLOYMENT_NAME", "foundry.model_deployment"),
];

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid retry.max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid polling.interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error(
        "Invalid polling configuration: timeout_secs ({0}) is shorter than interval_ms ({1})"
    )]
    PollTimeoutTooShort(u64, u64),

    #[error("Invalid server.max_message_chars: {0}. Must be positive")]
    InvalidMaxMessageChars(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Routing rules cannot be empty")]
    EmptyRoutingRules,

    #[error("Routing rule '{0}' has no keywords")]
    EmptyKeywordList(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `cbr-agents.yaml`, then `cbr-agents.local.yaml` (both optional),
    ///    or only `path` when one is given
    /// 3. Environment variables (`CBR_AGENTS_*`, nested with `__`)
    /// 4. Legacy environment variable names (see [`LEGACY_ENV_VARS`])
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(path)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The merged provider chain used by [`ConfigLoader::load`]
    pub fn figment(path: Option<&Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment
                .merge(Yaml::file(CONFIG_FILE))
                .merge(Yaml::file(LOCAL_CONFIG_FILE)),
        };

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Self::legacy_env())
    }

    /// Legacy variables re-keyed onto their nested config paths
    fn legacy_env() -> Env {
        let names: Vec<&str> = LEGACY_ENV_VARS.iter().map(|(name, _)| *name).collect();
        Env::raw().only(&names).map(|key| {
            LEGACY_ENV_VARS
                .iter()
                .find(|(name, _)| key == *name)
                .map_or_else(|| key.as_str().into(), |(_, path)| (*path).into())
        })
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.polling.interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(config.polling.interval_ms));
        }

        if config.polling.timeout_secs.saturating_mul(1000) < config.polling.interval_ms {
            return Err(ConfigError::PollTimeoutTooShort(
                config.polling.timeout_secs,
                config.polling.interval_ms,
            ));
        }

        if config.server.max_message_chars == 0 {
            return Err(ConfigError::InvalidMaxMessageChars(
                config.server.max_message_chars,
            ));
        }

        if !VALID_LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.routing.rules.is_empty() {
            return Err(ConfigError::EmptyRoutingRules);
        }

        for rule in &config.routing.rules {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::EmptyKeywordList(rule.label.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{IntentLabel, KeywordRule};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.polling.interval_ms, 1000);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxAttempts(0))
        );
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidPollInterval(0))
        );
    }

    #[test]
    fn test_validate_timeout_shorter_than_interval() {
        let mut config = Config::default();
        config.polling.interval_ms = 5000;
        config.polling.timeout_secs = 2;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::PollTimeoutTooShort(2, 5000))
        );
    }

    #[test]
    fn test_validate_zero_message_limit() {
        let mut config = Config::default();
        config.server.max_message_chars = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxMessageChars(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_routing_rules() {
        let mut config = Config::default();
        config.routing.rules.clear();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyRoutingRules)
        );

        config.routing.rules = vec![KeywordRule::new(IntentLabel::Booking, &[" "])];
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyKeywordList("booking".to_string()))
        );
    }

    #[test]
    fn test_legacy_names_are_all_mapped() {
        for (name, path) in LEGACY_ENV_VARS {
            assert!(!name.starts_with(ENV_PREFIX));
            assert!(path.contains('.'), "{name} should map onto a nested key");
        }
    }
}
