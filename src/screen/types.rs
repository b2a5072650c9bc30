// Screen, input and OCR seams used by the scan driver
use super::error::ScreenResult;
use crate::game_automation::match_image::SearchRegion;
use image::RgbImage;
use serde::Serialize;

/// One piece of recognised text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFragment {
    pub text: String,
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

// Trait defining screen capabilities (live desktop or recorded replay)
//
// Every call blocks until the action completed. Coordinates are absolute screen pixels;
// negative scroll amounts move the log downwards.
pub trait ScreenBackend {
    fn capture(&mut self, region: &SearchRegion) -> ScreenResult<RgbImage>;
    fn click(&mut self, x: i32, y: i32) -> ScreenResult<()>;
    fn scroll(&mut self, amount: i32) -> ScreenResult<()>;
    fn move_pointer(&mut self, x: i32, y: i32) -> ScreenResult<()>;
    fn screen_size(&self) -> (u32, u32);
    fn name(&self) -> &str;

    // Full-screen capture
    fn capture_screen(&mut self) -> ScreenResult<RgbImage> {
        let (width, height) = self.screen_size();
        self.capture(&SearchRegion::full_screen(width, height))
    }
}

// OCR black box: fragments in reading order
pub trait OcrEngine {
    fn extract_text(&mut self, image: &RgbImage) -> ScreenResult<Vec<TextFragment>>;
}

/// Join fragments in detection order; an empty result means the read failed
///
/// Fragments read with less than `min_confidence` are dropped first.
pub fn join_fragments(fragments: &[TextFragment], min_confidence: f32) -> Option<String> {
    let joined = fragments
        .iter()
        .filter(|f| f.confidence >= min_confidence)
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}
