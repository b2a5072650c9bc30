use crate::screen::ScreenError;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for scan setup and execution.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that prevent a scan from starting.
///
/// Failures inside a running scan are logged and absorbed by the driver; only
/// initialization problems surface here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Template directory not found: {path:?}")]
    TemplateDirectoryMissing { path: PathBuf },

    #[error("Failed to read template directory {path:?}: {source}")]
    TemplateDirectoryUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to load template {path:?}: {reason}")]
    TemplateUnreadable { path: PathBuf, reason: String },

    #[error("No templates found in {path:?}")]
    EmptyTemplateCategory { path: PathBuf },

    #[error("No '{prefix}*' marker templates found in {path:?}")]
    MarkerAssetsMissing { prefix: String, path: PathBuf },

    #[error("Failed to read config file {path:?}: {source}")]
    ConfigUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    ConfigInvalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {description}")]
    ConfigRejected { description: String },

    #[error("Failed to load image {path:?}: {reason}")]
    ImageUnreadable { path: PathBuf, reason: String },

    #[error("Screen backend failed: {source}")]
    Screen {
        #[from]
        source: ScreenError,
    },
}
