use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: unknown encoding '{label}'", path.display())]
    Encoding { path: PathBuf, label: String },
    #[error("{}: CSV error: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },
    #[error("{}: no header row", path.display())]
    NoHeader { path: PathBuf },
    #[error("cannot write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl IoError {
    /// The file the failure is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::UnsupportedFormat { path }
            | Self::Read { path, .. }
            | Self::Encoding { path, .. }
            | Self::Csv { path, .. }
            | Self::Spreadsheet { path, .. }
            | Self::NoHeader { path }
            | Self::Write { path, .. } => path,
        }
    }
}
