//! Error type shared by every stage of the co-occurrence analysis.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoocError {
    /// File could not be opened, read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a result line failed.
    #[error("failed to write result: {0}")]
    Write(#[from] std::io::Error),

    /// A record in an input file did not have the expected shape.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no documents to analyze")]
    EmptyCorpus,

    #[error("unknown token '{0}'")]
    UnknownToken(String),

    #[error("analysis cancelled after {0} results")]
    Cancelled(usize),

    #[error("deadline of {secs}s exceeded after {results} results")]
    DeadlineExceeded { secs: u64, results: usize },
}

impl CoocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoocError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        CoocError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        CoocError::Config(message.into())
    }

    pub fn grid(message: impl Into<String>) -> Self {
        CoocError::InvalidGrid(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoocError>;
