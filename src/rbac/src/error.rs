//! Error types for the access control engine

use std::path::PathBuf;
use thiserror::Error;

/// Access control engine errors
#[derive(Debug, Error)]
pub enum RbacError {
    /// A global domain file (users, roles, passwords) could not be read
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config line rejected while loading in reject mode
    #[error("Unrecognized line {line} in {file}: {text:?}")]
    Parse {
        file: String,
        line: usize,
        text: String,
    },

    /// Permission outside `allow` / `deny`
    #[error("Invalid permission: {0:?}")]
    InvalidPermission(String),

    /// Pattern could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Token encode/decode failure
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Config(String),
}

impl RbacError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for access control operations
pub type Result<T> = std::result::Result<T, RbacError>;
