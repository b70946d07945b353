use std::path::PathBuf;

use source2_demo::prelude::ParserError;
use thiserror::Error;

use crate::demo::DemoFormat;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot derive an output folder from demo path {0:?}")]
    InvalidDemoPath(PathBuf),

    #[error("Failed to open demo {path:?}: {source}")]
    OpenDemo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{format} files cannot be decoded directly; convert the demo to a frame log first")]
    UnsupportedContainer { format: DemoFormat },

    #[error("Failed to decode CS2 demo: {0}")]
    Decode(#[source] ParserError),

    #[error("Failed to create output folder {path:?}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create CSV file {path:?}: {source}")]
    CreateSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error during parsing at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::OpenDemo { source, .. } | Error::Io(source) => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
