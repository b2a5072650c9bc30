//! Configuration for card detection

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Matches below this confidence are dropped after matching (0.0 to 1.0)
    pub confidence_floor: f32,
    /// Same-name detections closer than this many pixels collapse into one
    pub duplicate_distance: f32,
    /// Whether to search the matcher's scale band or native size only
    pub enable_multiscale: bool,
    /// Vertical offset from a card's top edge to the point tracked as its position
    pub center_offset_y: i32,
    /// Click offset from a hero card's top-left corner
    pub hero_click_offset: (i32, i32),
    /// Click offset from a captain card's top-left corner
    pub captain_click_offset: (i32, i32),
    /// Card footprint used to pair captains with the hero in the same row
    pub card_width: u32,
    pub card_height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.78,
            duplicate_distance: 45.0,
            enable_multiscale: true,
            center_offset_y: 25,
            hero_click_offset: (25, 25),
            captain_click_offset: (20, 20),
            card_width: 110,
            card_height: 125,
        }
    }
}

/// Native-size matching with a stricter floor, for crisp recordings at the reference zoom
pub fn create_single_scale_config() -> DetectorConfig {
    DetectorConfig {
        confidence_floor: 0.85,
        enable_multiscale: false,
        ..DetectorConfig::default()
    }
}
