//! Pipeline orchestration error types.

/// Specific error conditions for pipeline operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// The item has no generated text to split
    #[display("Content item {} has no generated text", _0)]
    TextNotGenerated(String),
    /// The stage kind is not enabled for the item
    #[display("Stage {} is not enabled for item {}", stage, item)]
    StageDisabled {
        /// Stage name
        stage: String,
        /// Item id
        item: String,
    },
    /// A work queue was closed while enqueuing
    #[display("Work queue closed: {}", _0)]
    QueueClosed(String),
    /// Stage configuration is invalid
    #[display("Invalid stage configuration: {}", _0)]
    InvalidConfig(String),
    /// Master consistency context could not be produced
    #[display("Failed to build master context: {}", _0)]
    MasterContext(String),
}

/// Error type for pipeline operations.
///
/// # Examples
///
/// ```
/// use storyloom_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::TextNotGenerated("item-1".to_string()));
/// assert!(format!("{}", err).contains("item-1"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
