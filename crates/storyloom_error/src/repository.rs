//! Repository (segment/item/merge record store) error types.

/// Specific error conditions for repository operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RepositoryErrorKind {
    /// Content item does not exist
    #[display("Content item not found: {}", _0)]
    ItemNotFound(String),
    /// Segment does not exist
    #[display("Segment not found: {}", _0)]
    SegmentNotFound(String),
    /// Item already exists
    #[display("Content item already exists: {}", _0)]
    DuplicateItem(String),
    /// Segment key already exists
    #[display("Segment already exists: {}", _0)]
    DuplicateSegment(String),
    /// Backend reported a failure
    #[display("Repository backend failure: {}", _0)]
    Backend(String),
}

/// Repository error with location tracking.
///
/// # Examples
///
/// ```
/// use storyloom_error::{RepositoryError, RepositoryErrorKind};
///
/// let err = RepositoryError::new(RepositoryErrorKind::ItemNotFound("abc".to_string()));
/// assert!(format!("{}", err).contains("abc"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Repository Error: {} at line {} in {}", kind, line, file)]
pub struct RepositoryError {
    /// The specific error condition
    pub kind: RepositoryErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl RepositoryError {
    /// Create a new RepositoryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RepositoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
