//! External generation error types and retry classification.

/// Failure categories reported by external generation calls.
///
/// Providers surface opaque failures; this enum is the pipeline's view of them.
/// `RateLimited` is a transient failure that additionally trips the credential
/// circuit breaker in the gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Network failure, timeout or temporary provider outage
    #[display("Transient generation failure: {}", _0)]
    Transient(String),
    /// Quota exhausted or request rate exceeded for the credential in use
    #[display("Rate limited: {}", _0)]
    RateLimited(String),
    /// Content safety rejection
    #[display("Policy violation: {}", _0)]
    PolicyViolation(String),
    /// Authorization failure, malformed request or other non-retryable condition
    #[display("Permanent generation failure: {}", _0)]
    Permanent(String),
}

impl GenerationErrorKind {
    /// Classify a raw provider message.
    ///
    /// Quota and rate markers (`quota`, `rate`, `limit`, `429`) map to
    /// `RateLimited`; safety markers map to `PolicyViolation`; authorization
    /// markers map to `Permanent`. Anything else is treated as transient.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyloom_error::GenerationErrorKind;
    ///
    /// let kind = GenerationErrorKind::from_message("HTTP 429: Resource has been exhausted (quota)");
    /// assert!(matches!(kind, GenerationErrorKind::RateLimited(_)));
    /// ```
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if ["quota", "rate", "limit", "429"].iter().any(|m| lower.contains(m)) {
            GenerationErrorKind::RateLimited(message)
        } else if ["safety", "policy", "blocked", "prohibited"]
            .iter()
            .any(|m| lower.contains(m))
        {
            GenerationErrorKind::PolicyViolation(message)
        } else if ["unauthorized", "forbidden", "401", "403", "invalid api key"]
            .iter()
            .any(|m| lower.contains(m))
        {
            GenerationErrorKind::Permanent(message)
        } else {
            GenerationErrorKind::Transient(message)
        }
    }

    /// Check if a blind retry of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationErrorKind::Transient(_) | GenerationErrorKind::RateLimited(_)
        )
    }

    /// Check if the credential that produced this error should leave rotation.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, GenerationErrorKind::RateLimited(_))
    }

    /// Check if the failure was a content safety rejection.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, GenerationErrorKind::PolicyViolation(_))
    }

    /// Check if the failure must not be retried at all.
    pub fn is_permanent(&self) -> bool {
        matches!(self, GenerationErrorKind::Permanent(_))
    }

    /// The provider message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            GenerationErrorKind::Transient(m)
            | GenerationErrorKind::RateLimited(m)
            | GenerationErrorKind::PolicyViolation(m)
            | GenerationErrorKind::Permanent(m) => m,
        }
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            GenerationErrorKind::RateLimited(_) => (2000, 3, 30),
            GenerationErrorKind::Transient(_) => (1000, 3, 8),
            _ => (0, 0, 0),
        }
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use storyloom_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::PolicyViolation("blocked".to_string()));
/// assert!(format!("{}", err).contains("Policy violation"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a transient failure.
    #[track_caller]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Transient(message.into()))
    }

    /// Shorthand for a rate-limit failure.
    #[track_caller]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::RateLimited(message.into()))
    }

    /// Shorthand for a policy violation.
    #[track_caller]
    pub fn policy_violation(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::PolicyViolation(message.into()))
    }

    /// Shorthand for a permanent failure.
    #[track_caller]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Permanent(message.into()))
    }
}

/// Trait for errors that support retry logic.
///
/// This trait allows error types to specify whether they should trigger a retry
/// and what retry strategy parameters to use.
///
/// # Examples
///
/// ```
/// use storyloom_error::{GenerationError, RetryableError};
///
/// let err = GenerationError::rate_limited("429 Too Many Requests");
/// assert!(err.is_retryable());
/// let (backoff, retries, _max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(retries, 3);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like timeouts or exhausted quotas should return true.
    /// Policy rejections and authorization failures should return false.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (1000, 3, 8)
    }
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}
