use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for screen, input and OCR operations.
pub type ScreenResult<T> = Result<T, ScreenError>;

/// The error type for the external collaborators of a scan.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Screen capture of {region} failed: {description}")]
    CaptureFailed { region: String, description: String },

    #[error("{action} failed: {description}")]
    InputFailed { action: String, description: String },

    #[error("OCR failed: {description}")]
    OcrFailed { description: String },

    #[error("Region {region} is outside the {screen_width}x{screen_height} screen")]
    RegionOutOfBounds {
        region: String,
        screen_width: u32,
        screen_height: u32,
    },

    #[error("Replay source {path:?} unusable: {description}")]
    ReplaySource { path: PathBuf, description: String },
}

impl ScreenError {
    /// Check if the failed operation may succeed when retried on a later iteration
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScreenError::CaptureFailed { .. }
                | ScreenError::InputFailed { .. }
                | ScreenError::OcrFailed { .. }
        )
    }

    pub fn input(action: &str, description: impl Into<String>) -> Self {
        ScreenError::InputFailed {
            action: action.to_string(),
            description: description.into(),
        }
    }
}
