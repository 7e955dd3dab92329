//! Storefront configuration.
//!
//! Every setting has a default for the selected environment and can be
//! overridden through `STOREFRONT_*` environment variables:
//!
//! | Variable                         | Setting              |
//! |----------------------------------|----------------------|
//! | `STOREFRONT_ENV`                 | `development` or `production` |
//! | `STOREFRONT_LOG`                 | tracing filter directive |
//! | `STOREFRONT_REQUEST_TIMEOUT_MS`  | order read timeout |
//! | `STOREFRONT_BROADCAST_CAPACITY`  | observer buffer per store |
//! | `STOREFRONT_TRANSITION_POLICY`   | `strict` or `permissive` |
//!
//! # Example
//!
//! ```no_run
//! use storefront::config::StorefrontConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorefrontConfig::from_env()?;
//! println!("Order requests time out after {:?}", config.request_timeout());
//! # Ok(())
//! # }
//! ```

use crate::orders::TransitionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use storefront_runtime::StoreConfig;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid environment value
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    /// A variable was set but could not be parsed
    #[error("Failed to parse {var}: {message}")]
    ParseError {
        /// Variable name
        var: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production
    Production,
}

impl Environment {
    /// Parse an environment name
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvironment`] for unknown names.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }

    /// Check if this is the production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    const fn default_log_filter(self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production => "info",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Settings for a storefront process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Tracing filter directive, e.g. `storefront=debug,info`
    pub log_filter: String,
    /// How long an order read may wait for its result; writes never time out
    pub request_timeout_ms: u64,
    /// Observer buffer size for the cart and order stores
    pub broadcast_capacity: usize,
    /// How order status changes are checked
    pub transition_policy: TransitionPolicy,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl StorefrontConfig {
    /// Defaults for `environment`
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            log_filter: environment.default_log_filter().to_string(),
            request_timeout_ms: 5_000,
            broadcast_capacity: 64,
            transition_policy: TransitionPolicy::Strict,
        }
    }

    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to read variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("STOREFRONT_ENV")
            .map(|value| Environment::parse(&value))
            .transpose()?
            .unwrap_or_default();
        let mut config = Self::for_environment(environment);

        if let Some(filter) = lookup("STOREFRONT_LOG") {
            config.log_filter = filter;
        }
        if let Some(value) = lookup("STOREFRONT_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_var("STOREFRONT_REQUEST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("STOREFRONT_BROADCAST_CAPACITY") {
            config.broadcast_capacity = parse_var("STOREFRONT_BROADCAST_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("STOREFRONT_TRANSITION_POLICY") {
            config.transition_policy = value.parse().map_err(|message| ConfigError::ParseError {
                var: "STOREFRONT_TRANSITION_POLICY",
                message,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::ValidationError("log_filter cannot be empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "broadcast_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Request timeout as Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Runtime settings for the stores
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_broadcast_capacity(self.broadcast_capacity)
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|error: T::Err| ConfigError::ParseError {
        var,
        message: error.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.transition_policy, TransitionPolicy::Strict);
    }

    #[test]
    fn production_logs_at_info() {
        let config = StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_ENV", "prod")])).unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn overrides_apply() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("STOREFRONT_LOG", "storefront=trace"),
            ("STOREFRONT_REQUEST_TIMEOUT_MS", "250"),
            ("STOREFRONT_BROADCAST_CAPACITY", "8"),
            ("STOREFRONT_TRANSITION_POLICY", "permissive"),
        ]))
        .unwrap();

        assert_eq!(config.log_filter, "storefront=trace");
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.store_config().broadcast_capacity, 8);
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let result = StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_ENV", "staging")]));
        assert_eq!(result, Err(ConfigError::InvalidEnvironment("staging".to_string())));

        let result =
            StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_REQUEST_TIMEOUT_MS", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::ParseError { var: "STOREFRONT_REQUEST_TIMEOUT_MS", .. })
        ));

        let result =
            StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_BROADCAST_CAPACITY", "0")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
