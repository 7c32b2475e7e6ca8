//! Round-robin credential gate with cooldown and circuit breaking.

use crate::GateConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use serde::Serialize;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use storyloom_core::Credential;
use storyloom_error::{ConfigError, GenerationError, RetryableError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug)]
struct CredentialState {
    credential: Credential,
    // May lie in the future: a credential handed out before its cooldown
    // elapsed is stamped with the instant its caller will wake.
    last_used: Option<Instant>,
    request_count: u64,
    healthy: bool,
    // Bumped on every trip or reset so stale recovery timers do nothing.
    trips: u64,
}

impl CredentialState {
    fn ready_at(&self, cooldown: Duration) -> Option<Instant> {
        self.last_used.map(|t| t + cooldown)
    }

    fn usable(&self, now: Instant, cooldown: Duration) -> bool {
        self.healthy && self.ready_at(cooldown).is_none_or(|ready| now >= ready)
    }

    fn stamp(&mut self, at: Instant) {
        self.last_used = Some(at);
        self.request_count += 1;
    }
}

#[derive(Debug)]
struct GateState {
    credentials: Vec<CredentialState>,
    cursor: usize,
}

impl GateState {
    /// Pick a credential and stamp it. Returns how long the caller must wait.
    fn select(&mut self, now: Instant, cooldown: Duration) -> (Credential, Duration) {
        let n = self.credentials.len();

        for _ in 0..2 * n {
            let index = self.cursor;
            self.cursor = (self.cursor + 1) % n;
            let state = &mut self.credentials[index];
            if state.usable(now, cooldown) {
                state.stamp(now);
                return (state.credential.clone(), Duration::ZERO);
            }
        }

        let oldest = self
            .credentials
            .iter()
            .enumerate()
            .filter(|(_, s)| s.healthy)
            .min_by_key(|(_, s)| s.ready_at(cooldown))
            .map(|(i, _)| i);

        let index = match oldest {
            Some(index) => index,
            None => {
                warn!("No healthy credentials, forcing the first back into rotation");
                let first = &mut self.credentials[0];
                first.healthy = true;
                first.last_used = None;
                first.trips += 1;
                0
            }
        };

        self.cursor = (index + 1) % n;
        let state = &mut self.credentials[index];
        let start = state
            .ready_at(cooldown)
            .map_or(now, |ready| ready.max(now));
        state.stamp(start);
        (state.credential.clone(), start.saturating_duration_since(now))
    }
}

/// Usage statistics for one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct CredentialStats {
    /// One-based position in the rotation
    index: usize,
    /// Acquisitions since the last reset
    request_count: u64,
    /// Currently in rotation
    healthy: bool,
    /// First eight characters of the key
    key_preview: String,
    /// Time since last handed out, in milliseconds
    since_last_use_ms: Option<u64>,
}

/// Usage statistics for the whole gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct GateStats {
    /// Credentials configured
    total: usize,
    /// Credentials in rotation
    healthy: usize,
    /// Zero-based slot the next scan starts from
    cursor: usize,
    /// Per-credential details
    credentials: Vec<CredentialStats>,
}

/// Hands out credentials in rotation under a per-credential cooldown.
///
/// Cloning is cheap; clones share state. Inject one gate per process.
#[derive(Clone)]
pub struct CredentialGate {
    state: Arc<Mutex<GateState>>,
    config: GateConfig,
    ceiling: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("config", &self.config)
            .field("ceiling", &self.ceiling.is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialGate {
    /// Create a gate over the given keys.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `keys` is empty.
    pub fn new(keys: Vec<String>, config: GateConfig) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::new("Credential gate needs at least one key"));
        }

        let credentials = keys
            .into_iter()
            .enumerate()
            .map(|(slot, key)| CredentialState {
                credential: Credential::new(slot, key),
                last_used: None,
                request_count: 0,
                healthy: true,
                trips: 0,
            })
            .collect::<Vec<_>>();

        let ceiling = (*config.requests_per_minute())
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))));

        info!(
            credentials = credentials.len(),
            cooldown_ms = config.cooldown_ms(),
            rpm = ?config.requests_per_minute(),
            "Credential gate ready"
        );

        Ok(Self {
            state: Arc::new(Mutex::new(GateState {
                credentials,
                cursor: 0,
            })),
            config,
            ceiling,
        })
    }

    /// Create a gate from `PREFIX`, `PREFIX_1`, ... environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no credential is set.
    pub fn from_env(prefix: &str, config: GateConfig) -> Result<Self, ConfigError> {
        Self::new(crate::credentials_from_env(prefix)?, config)
    }

    /// The gate's timing configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Number of configured credentials.
    pub async fn credential_count(&self) -> usize {
        self.state.lock().await.credentials.len()
    }

    /// Wait for and return a usable credential.
    ///
    /// Never fails. When every credential is cooling down, the one that becomes
    /// ready first is reserved and the call sleeps until then. Selection and
    /// stamping happen under the gate's lock; the wait does not.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Credential {
        if let Some(ceiling) = &self.ceiling {
            ceiling.until_ready().await;
        }

        let (credential, wait) = {
            let mut state = self.state.lock().await;
            state.select(Instant::now(), self.config.cooldown())
        };

        if !wait.is_zero() {
            debug!(
                slot = credential.slot(),
                wait_ms = wait.as_millis() as u64,
                "All credentials cooling down, waiting"
            );
            tokio::time::sleep(wait).await;
        }

        debug!(slot = credential.slot(), "Credential acquired");
        credential
    }

    /// Take a credential out of rotation until the recovery window passes.
    ///
    /// Recovery runs on a background timer and restores the credential with
    /// its request count cleared.
    #[instrument(skip(self), fields(slot = credential.slot()))]
    pub async fn mark_unhealthy(&self, credential: &Credential, reason: &str) {
        let trips = {
            let mut state = self.state.lock().await;
            let Some(entry) = state.credentials.get_mut(credential.slot()) else {
                return;
            };
            entry.healthy = false;
            entry.trips += 1;
            entry.trips
        };

        warn!(
            %credential,
            reason,
            recovery_secs = self.config.recovery_secs(),
            "Credential marked unhealthy"
        );

        let state = Arc::clone(&self.state);
        let slot = credential.slot();
        let recovery = self.config.recovery();
        tokio::spawn(async move {
            tokio::time::sleep(recovery).await;
            let mut state = state.lock().await;
            if let Some(entry) = state.credentials.get_mut(slot) {
                if entry.trips == trips {
                    entry.healthy = true;
                    entry.request_count = 0;
                    info!(slot, "Credential recovered");
                }
            }
        });
    }

    /// Current usage statistics.
    pub async fn stats(&self) -> GateStats {
        let state = self.state.lock().await;
        let now = Instant::now();
        let credentials = state
            .credentials
            .iter()
            .map(|s| CredentialStats {
                index: s.credential.slot() + 1,
                request_count: s.request_count,
                healthy: s.healthy,
                key_preview: s.credential.preview(),
                since_last_use_ms: s
                    .last_used
                    .map(|t| now.saturating_duration_since(t).as_millis() as u64),
            })
            .collect::<Vec<_>>();

        GateStats {
            total: credentials.len(),
            healthy: credentials.iter().filter(|c| c.healthy).count(),
            cursor: state.cursor,
            credentials,
        }
    }

    /// Clear counters, restore health and rewind the cursor.
    pub async fn reset_stats(&self) {
        let mut state = self.state.lock().await;
        for entry in &mut state.credentials {
            entry.request_count = 0;
            entry.healthy = true;
            entry.last_used = None;
            entry.trips += 1;
        }
        state.cursor = 0;
        info!("Credential gate statistics reset");
    }

    /// Run one remote call with a freshly acquired credential.
    ///
    /// A rate-limit failure takes the credential out of rotation before the
    /// error is returned. No retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns the operation's error unchanged.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, GenerationError>
    where
        F: FnOnce(Credential) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let credential = self.acquire().await;
        let result = operation(credential.clone()).await;
        if let Err(e) = &result {
            if e.kind.trips_breaker() {
                self.mark_unhealthy(&credential, e.kind.message()).await;
            }
        }
        result
    }

    /// Run a single-unit remote call through the gate with retries.
    ///
    /// Each attempt acquires a fresh credential. Rate-limit failures take the
    /// credential out of rotation and retry; other transient failures retry
    /// with jittered exponential backoff; everything else fails immediately.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted or the error is not
    /// retryable.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, GenerationError>
    where
        F: Fn(Credential) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        use tokio_retry2::{
            Retry, RetryError,
            strategy::{ExponentialBackoff, jitter},
        };

        let retry_strategy = ExponentialBackoff::from_millis(*self.config.retry_backoff_ms())
            .factor(2)
            .max_delay(Duration::from_secs(*self.config.max_delay_secs()))
            .map(jitter)
            .take(*self.config.max_retries());

        let gate = self;
        let operation = &operation;
        Retry::spawn(retry_strategy, move || async move {
            let credential = gate.acquire().await;
            match operation(credential.clone()).await {
                Ok(value) => Ok(value),
                Err(e) if e.kind.trips_breaker() => {
                    gate.mark_unhealthy(&credential, e.kind.message()).await;
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) if e.is_retryable() => {
                    warn!("Transient error, will retry: {}", e);
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => {
                    warn!("Permanent error, failing immediately: {}", e);
                    Err(RetryError::Permanent(e))
                }
            }
        })
        .await
    }
}
