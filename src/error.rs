//! Error types for the analysis pipeline
//!
//! Two tiers:
//! - [`AnalysisError`] is fatal and reaches the caller (load failures, assembly failures).
//! - [`StageError`] is local to one pipeline stage. The pipeline maps it to that
//!   stage's documented default and never surfaces it.

use std::fmt;

/// Errors that abort an analysis run
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Invalid input parameters (empty signal, zero sample rate, ...)
    InvalidInput(String),

    /// Audio could not be decoded
    DecodingError {
        /// What went wrong
        message: String,
        /// Suggestion shown to the user
        hint: Option<String>,
    },

    /// Container or codec not supported by the decoder
    UnsupportedFormat(String),

    /// File system error while reading input or writing output
    Io(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (overflow, underflow, etc.)
    NumericalError(String),

    /// Final result failed validation while being assembled
    AssemblyError(String),
}

impl AnalysisError {
    /// True for load failures (missing, undecodable or unsupported file)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidInput(_)
                | AnalysisError::DecodingError { .. }
                | AnalysisError::UnsupportedFormat(_)
                | AnalysisError::Io(_)
        )
    }

    /// Diagnostic hint, if one is attached
    pub fn hint(&self) -> Option<&str> {
        match self {
            AnalysisError::DecodingError { hint, .. } => hint.as_deref(),
            AnalysisError::UnsupportedFormat(_) => Some(CONVERSION_HINT),
            _ => None,
        }
    }
}

/// Hint attached to decoding and format failures
pub const CONVERSION_HINT: &str =
    "This may be due to an unsupported audio format. Try converting to WAV format.";

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::DecodingError { message, hint } => match hint {
                Some(hint) => write!(f, "Failed to load audio file: {}. {}", message, hint),
                None => write!(f, "Failed to load audio file: {}", message),
            },
            AnalysisError::UnsupportedFormat(msg) => {
                write!(f, "Unsupported audio format: {}. {}", msg, CONVERSION_HINT)
            }
            AnalysisError::Io(msg) => write!(f, "I/O error: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            AnalysisError::AssemblyError(msg) => write!(f, "Result assembly failed: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::ProcessingError(format!("JSON serialization failed: {}", err))
    }
}

/// Recoverable failure inside a single pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    /// Not enough samples, frames or beats to compute anything meaningful
    InsufficientData(String),

    /// NaN/Inf or a degenerate denominator
    Numerical(String),

    /// An intermediate array came out empty
    EmptyIntermediate(String),

    /// A parameter made the computation impossible
    InvalidParameter(String),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::InsufficientData(msg) => write!(f, "insufficient data: {}", msg),
            StageError::Numerical(msg) => write!(f, "numerical failure: {}", msg),
            StageError::EmptyIntermediate(msg) => write!(f, "empty intermediate: {}", msg),
            StageError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Result type returned by every pipeline stage
pub type StageResult<T> = Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_classified() {
        assert!(AnalysisError::Io("missing".into()).is_input_error());
        assert!(AnalysisError::UnsupportedFormat("xyz".into()).is_input_error());
        assert!(!AnalysisError::AssemblyError("bad".into()).is_input_error());
        assert!(!AnalysisError::ProcessingError("bad".into()).is_input_error());
    }

    #[test]
    fn test_decoding_error_display_includes_hint() {
        let err = AnalysisError::DecodingError {
            message: "no audio track".into(),
            hint: Some(CONVERSION_HINT.into()),
        };
        let text = err.to_string();
        assert!(text.contains("no audio track"));
        assert!(text.contains("WAV"));
        assert_eq!(err.hint(), Some(CONVERSION_HINT));
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError::InsufficientData("3 beats".into());
        assert_eq!(err.to_string(), "insufficient data: 3 beats");
    }
}
