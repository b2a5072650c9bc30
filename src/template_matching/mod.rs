/// Template matching module for card detection in screenshots
///
/// This module provides:
/// - Normalized correlation matching with configurable thresholds
/// - Multi-scale search over a configurable scale band
/// - Greedy IoU non-maximum suppression
/// - Template libraries loaded from image directories
pub mod config;
pub mod loader;
pub mod matcher;
pub mod nms;
pub mod types;

pub use config::{MatchConfig, ScaleRange, create_card_config, create_marker_config};
pub use loader::{load_directory, load_library, load_prefixed};
pub use matcher::{TemplateMatcher, to_grayscale};
pub use nms::suppress_overlapping;
pub use types::{Match, MatchMethod, Template, TemplateLibrary};
