use std::path::PathBuf;

use thiserror::Error;

/// Dataset side, used to label schema errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// Internal price list.
    Reference,
    /// External website catalog.
    Target,
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "price list"),
            Self::Target => write!(f, "site catalog"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// Config file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON / TOML parse or deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty column name, bad rule, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Input or config path with an extension we cannot read.
    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// Missing required column in a loaded dataset.
    #[error("{dataset}: missing column '{column}'")]
    MissingColumn { dataset: Dataset, column: String },
}
