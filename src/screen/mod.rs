// Screen module - the scan's view of the outside world
// Capture, input and OCR are black boxes behind traits; the replay
// backend plays back recorded screenshots for offline runs and tests.

pub mod error;
pub mod replay;
pub mod types;


pub use error::{ScreenError, ScreenResult};
pub use replay::{ReplayBackend, ScriptedOcr};
pub use types::{OcrEngine, ScreenBackend, TextFragment, join_fragments};
