use thiserror::Error;

/// Main error type for building extraction definitions and in-memory grids.
/// Aggregates errors from dependencies and internal modules.
#[derive(Error, Debug)]
pub enum RefineryError {
    #[error("{0}")]
    WithContextError(String),

    // Third-party library errors
    #[error("{0}")]
    RegexError(#[from] regex::Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Spreadsheet module errors
    #[error("{0}")]
    RangeError(#[from] crate::spreadsheet::range::RangeError),

    // Header module errors
    #[error("{0}")]
    HeaderError(#[from] crate::header::HeaderError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RefineryError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| RefineryError::WithContextError(format!("{}: {}", message, e)))
    }
}
