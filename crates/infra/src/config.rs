//! Configuration: defaults, an optional TOML file, then environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bullion_core::{SequencePattern, UnderflowPolicy};
use bullion_observability::LogConfig;

pub const CONFIG_PATH_ENV: &str = "BULLION_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

/// Draft / transfer engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub draft_prefix: String,
    pub ledger_prefix: String,
    pub transfer_prefix: String,
    /// Zero-padding width of sequential identifiers.
    pub sequence_width: usize,
    /// Attempts per identifier-bearing write before giving up with a conflict.
    pub max_sequence_retries: u32,
    pub underflow_policy: UnderflowPolicy,
    /// Currency of a default cash slot created on first cash movement.
    pub default_currency: String,
    /// Cost center placed on provisional ledger entries.
    pub draft_cost_center: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draft_prefix: "DRF".to_string(),
            ledger_prefix: "TRX".to_string(),
            transfer_prefix: "FTR".to_string(),
            sequence_width: 3,
            max_sequence_retries: 5,
            underflow_policy: UnderflowPolicy::Clamp,
            default_currency: "USD".to_string(),
            draft_cost_center: "DRAFT".to_string(),
        }
    }
}

impl EngineConfig {
    pub const RETRY_RANGE: core::ops::RangeInclusive<u32> = 1..=10;

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefixes = [&self.draft_prefix, &self.ledger_prefix, &self.transfer_prefix];
        for prefix in prefixes {
            SequencePattern::new(prefix.as_str(), self.sequence_width)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if self.draft_prefix == self.ledger_prefix
            || self.draft_prefix == self.transfer_prefix
            || self.ledger_prefix == self.transfer_prefix
        {
            return Err(ConfigError::Invalid(
                "draft, ledger and transfer prefixes must differ".to_string(),
            ));
        }
        if !Self::RETRY_RANGE.contains(&self.max_sequence_retries) {
            return Err(ConfigError::Invalid(format!(
                "max_sequence_retries must be within {}..={} (got {})",
                Self::RETRY_RANGE.start(),
                Self::RETRY_RANGE.end(),
                self.max_sequence_retries
            )));
        }
        let currency = self.default_currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "default_currency must be a 3-letter code (got {:?})",
                self.default_currency
            )));
        }
        if self.draft_cost_center.trim().is_empty() {
            return Err(ConfigError::Invalid("draft_cost_center cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults, then `$BULLION_CONFIG` if set, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BULLION_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(addr) = lookup("BULLION_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(policy) = lookup("BULLION_UNDERFLOW_POLICY") {
            self.engine.underflow_policy = policy
                .parse()
                .map_err(|e: bullion_core::DomainError| ConfigError::Invalid(e.to_string()))?;
        }
        if let Some(currency) = lookup("BULLION_DEFAULT_CURRENCY") {
            self.engine.default_currency = currency.trim().to_ascii_uppercase();
        }
        if let Some(retries) = lookup("BULLION_MAX_SEQUENCE_RETRIES") {
            self.engine.max_sequence_retries = retries.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("BULLION_MAX_SEQUENCE_RETRIES is not a number: {retries:?}"))
            })?;
        }
        if let Some(json) = lookup("BULLION_LOG_JSON") {
            self.log.json = matches!(json.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.server.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.listen_addr cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.draft_prefix, "DRF");
        assert_eq!(config.engine.max_sequence_retries, 5);
        assert_eq!(config.engine.underflow_policy, UnderflowPolicy::Clamp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [engine]
            underflow_policy = "reject"
            default_currency = "AED"

            [server]
            listen_addr = "127.0.0.1:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.underflow_policy, UnderflowPolicy::Reject);
        assert_eq!(config.engine.default_currency, "AED");
        assert_eq!(config.engine.ledger_prefix, "TRX");
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BULLION_UNDERFLOW_POLICY", "reject"),
            ("BULLION_DEFAULT_CURRENCY", "eur"),
            ("BULLION_MAX_SEQUENCE_RETRIES", "7"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.engine.underflow_policy, UnderflowPolicy::Reject);
        assert_eq!(config.engine.default_currency, "EUR");
        assert_eq!(config.engine.max_sequence_retries, 7);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut bad_prefix = Config::default();
        bad_prefix.engine.draft_prefix = "DR1".to_string();
        assert!(bad_prefix.validate().is_err());

        let mut same_prefix = Config::default();
        same_prefix.engine.transfer_prefix = "TRX".to_string();
        assert!(same_prefix.validate().is_err());

        let mut retries = Config::default();
        retries.engine.max_sequence_retries = 11;
        assert!(retries.validate().is_err());

        let mut policy = Config::default();
        assert!(policy
            .apply_env(|k| (k == "BULLION_UNDERFLOW_POLICY").then(|| "ignore".to_string()))
            .is_err());
    }
}
