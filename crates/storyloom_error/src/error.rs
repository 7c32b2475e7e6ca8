//! Top-level error wrapper types.

use crate::{
    ConfigError, GenerationError, MergeError, PipelineError, RepositoryError, StorageError,
};

/// Every error condition a Storyloom crate can surface.
///
/// # Examples
///
/// ```
/// use storyloom_error::{StoryloomError, ConfigError};
///
/// let config_err = ConfigError::new("missing [gate] section");
/// let err: StoryloomError = config_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum StoryloomErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Artifact storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Repository error
    #[from(RepositoryError)]
    Repository(RepositoryError),
    /// External generation error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Audio merge error
    #[from(MergeError)]
    Merge(MergeError),
    /// Pipeline orchestration error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Storyloom error with kind discrimination.
///
/// # Examples
///
/// ```
/// use storyloom_error::{StoryloomResult, ConfigError};
///
/// fn might_fail() -> StoryloomResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Storyloom Error: {}", _0)]
pub struct StoryloomError(Box<StoryloomErrorKind>);

impl StoryloomError {
    /// Create a new error from a kind.
    pub fn new(kind: StoryloomErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoryloomErrorKind {
        &self.0
    }

    /// The generation failure behind this error, if any.
    pub fn as_generation(&self) -> Option<&GenerationError> {
        match self.kind() {
            StoryloomErrorKind::Generation(e) => Some(e),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to StoryloomErrorKind
impl<T> From<T> for StoryloomError
where
    T: Into<StoryloomErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Storyloom operations.
///
/// # Examples
///
/// ```
/// use storyloom_error::{StoryloomResult, StorageError, StorageErrorKind};
///
/// fn read_artifact() -> StoryloomResult<Vec<u8>> {
///     Err(StorageError::new(StorageErrorKind::NotFound("a.wav".to_string())))?
/// }
/// ```
pub type StoryloomResult<T> = std::result::Result<T, StoryloomError>;
