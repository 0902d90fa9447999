//! Defines custom error types for the library.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Identifies which of the two compared executions an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The generated target-language artifact.
    Converted,
    /// The original source package, run by its own toolchain.
    Original,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Converted => f.write_str("converted"),
            Side::Original => f.write_str("original"),
        }
    }
}

#[derive(Error, Debug)]
/// Error type returned when converting or verifying a package fails.
pub enum GengoError {
    /// A process either could not be started or exited abnormally.
    #[error("`{command}` failed ({side} side): {reason}")]
    ExecutionFailed {
        side: Side,
        command: String,
        reason: String,
    },

    #[error("test failed: output has differences")]
    OutputMismatch,

    #[error("failed to convert {}: `{command}` {reason}", dir.display())]
    Conversion {
        dir: PathBuf,
        command: String,
        reason: String,
    },

    #[error("cannot read {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for GengoError {
    fn from(err: io::Error) -> Self {
        GengoError::Io(err.to_string())
    }
}
