use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading lookup tables and parsing flow logs.
#[derive(Error, Debug)]
pub enum FlowTagError {
    /// Source file does not exist
    #[error("could not find the file: {}", path.display())]
    NotFound { path: PathBuf },

    /// A row or line could not be decoded into the expected shape
    #[error("malformed input in {source_name} at line {line}: {reason}")]
    MalformedInput {
        source_name: String,
        line: u64,
        reason: String,
    },

    /// Flow log record carries a version other than 2
    #[error("unsupported log version {version} at line {line}, expected version 2")]
    UnsupportedVersion { line: u64, version: String },

    /// Any other I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FlowTagError {
    /// Map an open/read failure to `NotFound` when the file is missing.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FlowTagError::NotFound { path }
        } else {
            FlowTagError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FlowTagError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, FlowTagError>;
