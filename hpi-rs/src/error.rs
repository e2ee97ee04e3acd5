/// Represents all possible errors that can occur in the HPI library.
///
/// This enum is used throughout the crate to provide detailed error information for
/// operations that may fail, such as archive parsing, extraction, and I/O operations.
///
/// A missing file, directory, or key is never an error; lookups return `Option`
/// (or a default) instead.
#[derive(Debug)]
pub enum HpiError {
    /// Represents a malformed or corrupt archive, chunk, or cache: bad magic,
    /// unsupported version, runaway offset, bad compression tag, failed checksum.
    FormatError(String),
    /// Represents an error that occurs during I/O operations on the underlying stream.
    Io(std::io::Error),
}

/// Provides a user-friendly string representation for each error variant in `HpiError`.
impl std::fmt::Display for HpiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HpiError::FormatError(err) => write!(f, "Format error: {err}"),
            HpiError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

/// Implements the standard error trait for `HpiError`, allowing it to be used with
/// error chaining and other error handling utilities.
impl std::error::Error for HpiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HpiError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Allows automatic conversion from `std::io::Error` to `HpiError`.
impl From<std::io::Error> for HpiError {
    fn from(error: std::io::Error) -> Self {
        HpiError::Io(error)
    }
}
