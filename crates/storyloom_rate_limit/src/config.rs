//! Gate configuration and credential discovery.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use storyloom_error::ConfigError;
use tracing::debug;

/// Timing parameters for the credential gate.
///
/// # Example
///
/// ```toml
/// [gate]
/// cooldown_ms = 1000
/// recovery_secs = 60
/// requests_per_minute = 60
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct GateConfig {
    /// Minimum gap between two uses of the same credential
    #[serde(default = "default_cooldown_ms")]
    cooldown_ms: u64,

    /// Time an unhealthy credential stays out of rotation
    #[serde(default = "default_recovery_secs")]
    recovery_secs: u64,

    /// Ceiling across all credentials; unlimited when absent
    #[serde(default)]
    requests_per_minute: Option<u32>,

    /// Initial backoff for `execute` retries
    #[serde(default = "default_retry_backoff_ms")]
    retry_backoff_ms: u64,

    /// Retries `execute` makes after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: usize,

    /// Upper bound on a single `execute` backoff
    #[serde(default = "default_max_delay_secs")]
    max_delay_secs: u64,
}

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_recovery_secs() -> u64 {
    60
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_max_retries() -> usize {
    3
}

fn default_max_delay_secs() -> u64 {
    30
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            recovery_secs: default_recovery_secs(),
            requests_per_minute: None,
            retry_backoff_ms: default_retry_backoff_ms(),
            max_retries: default_max_retries(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl GateConfig {
    /// Cooldown as a duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Recovery window as a duration.
    pub fn recovery(&self) -> Duration {
        Duration::from_secs(self.recovery_secs)
    }
}

/// Collect credentials through an arbitrary variable lookup.
///
/// Reads `PREFIX`, then `PREFIX_1`, `PREFIX_2`, ... until the first missing
/// numbered variable. Blank values are skipped.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use storyloom_rate_limit::credentials_from_lookup;
///
/// let vars = HashMap::from([
///     ("GEMINI_API_KEY_1", "one"),
///     ("GEMINI_API_KEY_2", "two"),
/// ]);
/// let keys = credentials_from_lookup("GEMINI_API_KEY", |name| vars.get(name).map(|v| v.to_string())).unwrap();
/// assert_eq!(keys, vec!["one", "two"]);
/// ```
///
/// # Errors
///
/// Returns `ConfigError` when no non-blank credential is found.
pub fn credentials_from_lookup(
    prefix: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<String>, ConfigError> {
    let mut keys = Vec::new();
    let mut push = |value: Option<String>| {
        if let Some(value) = value {
            let value = value.trim().to_string();
            if !value.is_empty() {
                keys.push(value);
            }
        }
    };

    push(lookup(prefix));
    let mut n = 1;
    loop {
        let value = lookup(&format!("{prefix}_{n}"));
        if value.is_none() {
            break;
        }
        push(value);
        n += 1;
    }

    if keys.is_empty() {
        return Err(ConfigError::new(format!(
            "No credentials found: set {prefix} or {prefix}_1, {prefix}_2, ..."
        )));
    }

    debug!(count = keys.len(), prefix, "Loaded credentials");
    Ok(keys)
}

/// Collect credentials from process environment variables.
///
/// # Errors
///
/// Returns `ConfigError` when no non-blank credential is set.
pub fn credentials_from_env(prefix: &str) -> Result<Vec<String>, ConfigError> {
    credentials_from_lookup(prefix, |name| std::env::var(name).ok())
}
