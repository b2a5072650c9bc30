//! Offline backend over recorded screenshots
//!
//! Frames are the image files of a directory in file name order. A downward scroll
//! advances to the next frame, an upward scroll steps back. OCR results are scripted
//! by `labels.txt` in the same directory, one read per line (an empty line is a failed read).

use super::error::{ScreenError, ScreenResult};
use super::types::{OcrEngine, ScreenBackend, TextFragment};
use crate::game_automation::match_image::SearchRegion;
use image::RgbImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub const LABELS_FILE: &str = "labels.txt";

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct ReplayBackend {
    name: String,
    frames: Vec<PathBuf>,
    current: usize,
    cached: Option<(usize, RgbImage)>,
    screen_width: u32,
    screen_height: u32,
    clicks: Vec<(i32, i32)>,
    scrolls: Vec<i32>,
}

impl ReplayBackend {
    /// Open a directory of recorded full-screen frames
    pub fn open(directory: &Path) -> ScreenResult<Self> {
        let entries = std::fs::read_dir(directory).map_err(|e| ScreenError::ReplaySource {
            path: directory.to_path_buf(),
            description: e.to_string(),
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| FRAME_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();

        let first = frames.first().ok_or_else(|| ScreenError::ReplaySource {
            path: directory.to_path_buf(),
            description: "no frames found".to_string(),
        })?;
        let (screen_width, screen_height) =
            image::image_dimensions(first).map_err(|e| ScreenError::ReplaySource {
                path: first.clone(),
                description: e.to_string(),
            })?;

        log::info!(
            "🎞️ Replay source {} with {} frames ({}x{})",
            directory.display(),
            frames.len(),
            screen_width,
            screen_height
        );

        Ok(Self {
            name: format!("replay:{}", directory.display()),
            frames,
            current: 0,
            cached: None,
            screen_width,
            screen_height,
            clicks: Vec::new(),
            scrolls: Vec::new(),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn clicks(&self) -> &[(i32, i32)] {
        &self.clicks
    }

    pub fn scrolls(&self) -> &[i32] {
        &self.scrolls
    }

    fn frame(&mut self) -> ScreenResult<&RgbImage> {
        let stale = self
            .cached
            .as_ref()
            .map(|(index, _)| *index != self.current)
            .unwrap_or(true);

        if stale {
            let path = &self.frames[self.current];
            let image = image::open(path).map_err(|e| ScreenError::CaptureFailed {
                region: path.display().to_string(),
                description: e.to_string(),
            })?;
            self.cached = Some((self.current, image.to_rgb8()));
        }

        match &self.cached {
            Some((_, image)) => Ok(image),
            None => Err(ScreenError::CaptureFailed {
                region: "frame cache".to_string(),
                description: "frame not loaded".to_string(),
            }),
        }
    }
}

impl ScreenBackend for ReplayBackend {
    fn capture(&mut self, region: &SearchRegion) -> ScreenResult<RgbImage> {
        let screen = SearchRegion::full_screen(self.screen_width, self.screen_height);
        if !region.is_valid() || !region.is_within(&screen) {
            return Err(ScreenError::RegionOutOfBounds {
                region: region.to_string(),
                screen_width: self.screen_width,
                screen_height: self.screen_height,
            });
        }

        let frame = self.frame()?;
        region
            .crop_rgb(frame, &screen)
            .ok_or_else(|| ScreenError::CaptureFailed {
                region: region.to_string(),
                description: "recorded frame smaller than the screen".to_string(),
            })
    }

    fn click(&mut self, x: i32, y: i32) -> ScreenResult<()> {
        let screen = SearchRegion::full_screen(self.screen_width, self.screen_height);
        if !screen.contains_point(x, y) {
            return Err(ScreenError::input(
                "click",
                format!("({}, {}) is off the {} screen", x, y, screen),
            ));
        }
        log::debug!("🖱️ Replay click at ({}, {})", x, y);
        self.clicks.push((x, y));
        Ok(())
    }

    fn scroll(&mut self, amount: i32) -> ScreenResult<()> {
        self.scrolls.push(amount);
        if amount < 0 {
            self.current = (self.current + 1).min(self.frames.len() - 1);
        } else if amount > 0 {
            self.current = self.current.saturating_sub(1);
        }
        log::debug!(
            "📜 Replay scroll {} -> frame {}/{}",
            amount,
            self.current + 1,
            self.frames.len()
        );
        Ok(())
    }

    fn move_pointer(&mut self, _x: i32, _y: i32) -> ScreenResult<()> {
        Ok(())
    }

    fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// OCR engine answering from a prepared list of reads
#[derive(Debug, Clone, Default)]
pub struct ScriptedOcr {
    reads: VecDeque<String>,
}

impl ScriptedOcr {
    pub fn new<I, S>(reads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reads: reads.into_iter().map(Into::into).collect(),
        }
    }

    /// Load `labels.txt` from a replay directory; a missing file gives an empty script
    pub fn from_directory(directory: &Path) -> ScreenResult<Self> {
        let path = directory.join(LABELS_FILE);
        if !path.exists() {
            log::warn!("⚠️ No {} in {}, every label read will fail", LABELS_FILE, directory.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ScreenError::ReplaySource {
            path: path.clone(),
            description: e.to_string(),
        })?;
        Ok(Self::new(content.lines()))
    }

    pub fn remaining(&self) -> usize {
        self.reads.len()
    }
}

impl OcrEngine for ScriptedOcr {
    fn extract_text(&mut self, _image: &RgbImage) -> ScreenResult<Vec<TextFragment>> {
        Ok(self
            .reads
            .pop_front()
            .map(|line| {
                line.split_whitespace()
                    .map(|word| TextFragment::new(word, 1.0))
                    .collect()
            })
            .unwrap_or_default())
    }
}
