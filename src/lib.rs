pub mod args;
pub mod config;
pub mod error;
pub mod game_automation;
pub mod screen;
pub mod template_matching;

#[cfg(test)]
mod test_images;

pub use config::ScanConfig;
pub use error::{ScanError, ScanResult};
pub use game_automation::{CancelToken, ScanAssets, ScanDriver, ScanReport};
