//! Unified error types for the topology tutor
//!
//! [`TutorError`] is returned by every fallible operation in the library
//! crates. The command-line front end wraps it in `anyhow` for context.
//!
//! # Example
//!
//! ```ignore
//! use tutor_core::{GridTopology, TutorResult};
//!
//! fn count_objects(path: &str) -> TutorResult<usize> {
//!     let grid = GridTopology::load(path)?;
//!     Ok(grid.n_objects())
//! }
//! ```

use thiserror::Error;

use crate::ids::SubstationId;

/// Unified error type for all tutor operations.
#[derive(Error, Debug)]
pub enum TutorError {
    /// A substation is left with fewer than two live objects.
    ///
    /// Raised while enumerating actions; it aborts the whole build.
    #[error("Illegal topology: substation {substation} has {remaining} live object(s), at least 2 required")]
    IllegalTopology {
        substation: SubstationId,
        remaining: usize,
    },

    /// Malformed or unsupported configuration input
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using TutorError.
pub type TutorResult<T> = Result<T, TutorError>;

impl TutorError {
    /// Shorthand for [`TutorError::InvalidConfiguration`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        TutorError::InvalidConfiguration(msg.into())
    }
}

impl From<anyhow::Error> for TutorError {
    fn from(err: anyhow::Error) -> Self {
        TutorError::Other(err.to_string())
    }
}

impl From<String> for TutorError {
    fn from(s: String) -> Self {
        TutorError::Other(s)
    }
}

impl From<&str> for TutorError {
    fn from(s: &str) -> Self {
        TutorError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        TutorError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for TutorError {
    fn from(err: toml::de::Error) -> Self {
        TutorError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for TutorError {
    fn from(err: toml::ser::Error) -> Self {
        TutorError::Other(err.to_string())
    }
}
