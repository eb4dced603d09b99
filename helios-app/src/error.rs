//! Application error types

use std::path::PathBuf;

use helios_core::CoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum AppError {
    /// The configuration file exists but could not be read
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The configuration file is not valid
    #[error("Invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AppError {
    /// Whether the error comes from user-controlled input rather than a bug.
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Io { .. } | Self::Config { .. } => true,
            Self::Core(e) => e.is_expected(),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
