//! Audio merge error types.

/// Specific error conditions for audio merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum MergeErrorKind {
    /// Nothing to merge
    #[display("No audio segments to merge")]
    NoSegments,
    /// An input file is missing
    #[display("Audio file not found: {}", _0)]
    MissingFile(String),
    /// An input file does not share the first file's sample format
    #[display("Format mismatch in {}: expected {}, found {}", path, expected, found)]
    FormatMismatch {
        /// Offending file
        path: String,
        /// Format of the first segment
        expected: String,
        /// Format of the offending segment
        found: String,
    },
    /// WAV decoding or encoding failed
    #[display("WAV error: {}", _0)]
    Wav(String),
    /// Filesystem failure while writing the output
    #[display("I/O error: {}", _0)]
    Io(String),
}

/// Audio merge error with location tracking.
///
/// # Examples
///
/// ```
/// use storyloom_error::{MergeError, MergeErrorKind};
///
/// let err = MergeError::new(MergeErrorKind::MissingFile("chunk0.wav".to_string()));
/// assert!(format!("{}", err).contains("chunk0.wav"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Merge Error: {} at line {} in {}", kind, line, file)]
pub struct MergeError {
    /// The specific error condition
    pub kind: MergeErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl MergeError {
    /// Create a new MergeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: MergeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
