use std::path::PathBuf;

use homewrecker_engine::{ArbitrationError, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("arbitration failed: {0}")]
    Arbitration(#[from] ArbitrationError),
}
