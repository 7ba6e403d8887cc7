use std::io;

use crate::smoothing::Smoothing;

/// Errors returned by counting, loading and saving language models.
///
/// A failed `load` always leaves the model cleared, so the variant is the
/// only thing the caller has to act on.
#[derive(Debug, thiserror::Error)]
pub enum LmError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("out of memory")]
    OutOfMemory,

    #[error("line {line}: invalid UTF-8")]
    Encoding { line: usize },

    #[error("line {line}: malformed header: {reason}")]
    Header { line: usize, reason: String },

    #[error("line {line}: {level}-gram entry has {found} tokens, expected at least {expected}")]
    NumTokens {
        line: usize,
        level: usize,
        found: usize,
        expected: usize,
    },

    #[error("{level}-gram count mismatch: declared {expected}, read {read}")]
    Count {
        level: usize,
        expected: usize,
        read: usize,
    },

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("unexpected {level}-grams section for a model of order {order}")]
    OrderUnexpected { level: usize, order: usize },

    #[error("order {requested} not supported (maximum {max})")]
    OrderUnsupported { requested: usize, max: usize },

    #[error("empty n-gram")]
    EmptyNGram,

    #[error("smoothing {0} not supported by this model")]
    UnsupportedSmoothing(Smoothing),
}

impl LmError {
    /// Stable numeric code for callers that report errors as integers.
    /// Zero is left free for success.
    pub fn code(&self) -> i32 {
        match self {
            LmError::Io(_) => 1,
            LmError::OutOfMemory => 2,
            LmError::Encoding { .. } => 3,
            LmError::Header { .. } => 4,
            LmError::NumTokens { .. } => 5,
            LmError::Count { .. } => 6,
            LmError::UnexpectedEof => 7,
            LmError::OrderUnexpected { .. } => 8,
            LmError::OrderUnsupported { .. } => 9,
            LmError::EmptyNGram => 10,
            LmError::UnsupportedSmoothing(_) => 11,
        }
    }

    /// True for the malformed-file family of errors.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            LmError::Header { .. }
                | LmError::NumTokens { .. }
                | LmError::Count { .. }
                | LmError::UnexpectedEof
        )
    }
}

impl From<std::collections::TryReserveError> for LmError {
    fn from(_: std::collections::TryReserveError) -> Self {
        LmError::OutOfMemory
    }
}
