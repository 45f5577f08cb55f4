use thiserror::Error;

/// Result type for line parsing and parser setup.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while setting up a parser or turning a line into a record.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The line is too short for the field being read, or a numeric token does not convert.
    #[error("format error at token {index}: {reason}")]
    Format { index: usize, reason: String },

    /// A required option has no value and no default, or fails validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The checkpoint query against the backing store failed.
    #[error("backing store error: {0}")]
    BackingStore(String),
}

impl ParseError {
    pub fn missing_token(index: usize, available: usize) -> Self {
        ParseError::Format {
            index,
            reason: format!("line has only {} tokens", available),
        }
    }

    pub fn bad_number(index: usize, token: &str, expected: &str) -> Self {
        ParseError::Format {
            index,
            reason: format!("'{}' is not a valid {}", token, expected),
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ParseError::Format { .. })
    }
}

impl From<rusqlite::Error> for ParseError {
    fn from(err: rusqlite::Error) -> Self {
        ParseError::BackingStore(err.to_string())
    }
}
