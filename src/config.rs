//! Scan configuration
//!
//! Defaults are tuned for the reference capture setup (1920x1080 desktop, report window
//! at its default position). Any subset can be overridden from a JSON file.

use crate::error::{ScanError, ScanResult};
use crate::game_automation::match_image::{DetectorConfig, SearchRegion};
use crate::game_automation::scroll::ScrollConfig;
use crate::game_automation::tracker::TrackerConfig;
use crate::template_matching::{MatchConfig, create_card_config};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed screen geometry of the report window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// The scrolling log of hero and captain cards
    pub log_region: SearchRegion,
    /// Gametag line of an opened hero panel
    pub label_region: SearchRegion,
    /// Name line of an opened captain panel
    pub captain_name_region: SearchRegion,
    /// Opened captain panel, searched for armor
    pub captain_panel_region: SearchRegion,
    pub close_hero: (i32, i32),
    pub close_captain: (i32, i32),
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            log_region: SearchRegion::new(490, 441, 444, 380, "log"),
            label_region: SearchRegion::from_corners(1190, 335, 1327, 355, "gametag"),
            captain_name_region: SearchRegion::from_corners(1121, 341, 1260, 355, "captain_name"),
            captain_panel_region: SearchRegion::from_corners(527, 361, 1006, 805, "captain_panel"),
            close_hero: (1421, 319),
            close_captain: (1378, 317),
        }
    }
}

impl LayoutConfig {
    /// Where the pointer rests so wheel events reach the log
    pub fn log_focus(&self) -> (i32, i32) {
        self.log_region.center()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Countdown before the session starts, so the report window can be brought up
    pub start_delay_secs: u64,
    /// Hero panel opening animation
    pub hero_panel_ms: u64,
    /// Captain panel opening animation
    pub captain_panel_ms: u64,
    /// After closing a panel and after pointer moves
    pub close_ms: u64,
    /// After the focus click on the log
    pub focus_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_delay_secs: 0,
            hero_panel_ms: 5000,
            captain_panel_ms: 3000,
            close_ms: 200,
            focus_ms: 300,
        }
    }
}

impl TimingConfig {
    pub fn hero_panel(&self) -> Duration {
        Duration::from_millis(self.hero_panel_ms)
    }

    pub fn captain_panel(&self) -> Duration {
        Duration::from_millis(self.captain_panel_ms)
    }

    pub fn close(&self) -> Duration {
        Duration::from_millis(self.close_ms)
    }

    pub fn focus(&self) -> Duration {
        Duration::from_millis(self.focus_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptainConfig {
    /// Captains anyone may bring; every other captain is reported
    pub allowed: BTreeSet<String>,
    /// Open allowed captains too (their panels are read but nothing is reported)
    pub inspect_all: bool,
    /// Position grid used to skip a captain slot already handled
    pub position_grid: i32,
}

impl Default for CaptainConfig {
    fn default() -> Self {
        Self {
            allowed: ["aurora", "carter", "dustan", "farhad", "helen", "stror", "tengel"]
                .into_iter()
                .map(String::from)
                .collect(),
            inspect_all: false,
            position_grid: 10,
        }
    }
}

impl CaptainConfig {
    pub fn is_allowed(&self, captain: &str) -> bool {
        self.allowed.contains(&captain.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub heroes_dir: PathBuf,
    pub captains_dir: PathBuf,
    /// Start marker, end markers and armor templates
    pub markers_dir: PathBuf,
    pub start_marker: String,
    pub start_marker_threshold: f32,
    /// File name prefix of the end-of-report templates
    pub end_marker_prefix: String,
    pub end_marker_threshold: f32,
    /// File name prefix of the armor templates; none loaded disables the check
    pub armor_prefix: String,
    pub armor_threshold: f32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            heroes_dir: PathBuf::from("templates/heroes"),
            captains_dir: PathBuf::from("templates/captains"),
            markers_dir: PathBuf::from("templates"),
            start_marker: "allied_attacking_troops".to_string(),
            start_marker_threshold: 0.75,
            end_marker_prefix: "dragon".to_string(),
            end_marker_threshold: 0.8,
            armor_prefix: "armor".to_string(),
            armor_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Text fragments read with less confidence are dropped before joining
    pub min_label_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_label_confidence: 0.0,
        }
    }
}

/// Everything a scan session needs to know
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub matcher: MatchConfig,
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub scroll: ScrollConfig,
    pub layout: LayoutConfig,
    pub timing: TimingConfig,
    pub captains: CaptainConfig,
    pub ocr: OcrConfig,
    pub assets: AssetConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            matcher: create_card_config(),
            detector: DetectorConfig::default(),
            tracker: TrackerConfig::default(),
            scroll: ScrollConfig::default(),
            layout: LayoutConfig::default(),
            timing: TimingConfig::default(),
            captains: CaptainConfig::default(),
            ocr: OcrConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Read a (partial) JSON config; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> ScanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ScanError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ScanConfig =
            serde_json::from_str(&content).map_err(|source| ScanError::ConfigInvalid {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        log::info!("⚙️ Loaded config from {}", path.display());
        Ok(config)
    }

    /// Same config with every wait removed, for recorded frames that need no animation time
    pub fn without_delays(mut self) -> Self {
        self.timing = TimingConfig {
            start_delay_secs: 0,
            hero_panel_ms: 0,
            captain_panel_ms: 0,
            close_ms: 0,
            focus_ms: 0,
        };
        let scroll = &mut self.scroll;
        for step in [
            &mut scroll.empty_frame,
            &mut scroll.stuck,
            &mut scroll.exhausted,
            &mut scroll.all_skipped,
            &mut scroll.progress,
            &mut scroll.start_search_step,
            &mut scroll.start_found_step,
            &mut scroll.align_step,
        ] {
            step.settle_ms = 0;
        }
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Reject values the scan cannot work with
    pub fn validate(&self) -> ScanResult<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        let problem = if !in_unit(self.matcher.default_threshold) {
            Some("matcher.default_threshold must be within 0..=1")
        } else if !in_unit(self.detector.confidence_floor) {
            Some("detector.confidence_floor must be within 0..=1")
        } else if !in_unit(self.ocr.min_label_confidence) {
            Some("ocr.min_label_confidence must be within 0..=1")
        } else if !self.layout.log_region.is_valid() {
            Some("layout.log_region must not be empty")
        } else if self.scroll.hash_precision == 0 {
            Some("scroll.hash_precision must be at least 1")
        } else if self.tracker.y_tolerance < 0 {
            Some("tracker.y_tolerance must not be negative")
        } else {
            None
        };

        match problem {
            Some(description) => Err(ScanError::ConfigRejected {
                description: description.to_string(),
            }),
            None => Ok(()),
        }
    }
}
