//! Domain-specific error types for the codec pipeline.
//!
//! All fallible operations return `Result<T, CodecError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the progressive codec pipeline.
#[derive(Debug, Error)]
pub enum CodecError {
    // ── Tile Text Errors ─────────────────────────────────────────
    /// Tile text could not be parsed: bad token, wrong token width,
    /// ragged rows, or plane shapes that disagree.
    #[error("malformed tile data: {0}")]
    Format(String),

    // ── Parameter Errors ─────────────────────────────────────────
    /// A parameter set has the wrong shape for the pipeline.
    #[error("invalid parameters: {0}")]
    Validation(String),

    /// A numeric argument is outside its legal range.
    #[error("value out of range: {0}")]
    Value(String),

    /// A stage was fed the wrong number of input tiles.
    #[error("stage '{stage}' expects {expected} input tile(s), got {actual}")]
    Arity {
        stage: String,
        expected: String,
        actual: usize,
    },

    // ── Pipeline Errors ──────────────────────────────────────────
    /// No stage with the requested name exists at the searched level.
    #[error("Action not found")]
    ActionNotFound,

    /// A stage name was registered twice in the same pipeline.
    #[error("duplicate stage name: {0}")]
    DuplicateStage(String),

    // ── I/O Errors ───────────────────────────────────────────────
    /// A tile file could not be read.
    #[error("tile load failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CodecError::Format("unexpected token 'xyz'".into());
        assert!(e.to_string().contains("xyz"));

        let e = CodecError::Arity {
            stage: "Quantization".into(),
            expected: "exactly 1".into(),
            actual: 3,
        };
        assert!(e.to_string().contains("Quantization"));
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn action_not_found_message_is_stable() {
        // The viewer surfaces this message verbatim in its fail envelope.
        assert_eq!(CodecError::ActionNotFound.to_string(), "Action not found");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such tile");
        let e: CodecError = io_err.into();
        assert!(matches!(e, CodecError::Io(_)));
    }
}
