//! Card detection for the battle report log
//!
//! This module turns raw template matches into typed card sightings in screen
//! coordinates, and locates the start and end markers of the report.

pub mod config;
pub mod detector;
pub mod region;

#[cfg(test)]
mod tests;

// Re-export main types and functions
pub use config::{DetectorConfig, create_single_scale_config};
pub use detector::{CardDetector, CardSighting, DetectionResult, suppress_nearby};
pub use region::SearchRegion;
