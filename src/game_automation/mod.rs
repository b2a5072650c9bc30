// Battle report scan automation
// A finite state machine walks the report log: find the start marker, then scroll,
// detect cards and read each player's label once until the report ends.

pub mod cancel;
pub mod content_hash;
pub mod fsm;
pub mod match_image;
pub mod report;
pub mod scroll;
pub mod tracker;
pub mod types;

// Re-export the main types and functions for easy access
pub use cancel::CancelToken;
pub use content_hash::{ContentTracker, content_hash};
pub use fsm::{ScanAssets, ScanDriver};
pub use match_image::{CardDetector, CardSighting, DetectionResult, DetectorConfig, SearchRegion};
pub use report::{Participant, ScanReport, TrackerStats};
pub use scroll::{FrameOutcome, ScrollConfig, ScrollDecision, ScrollPolicy, ScrollStep};
pub use tracker::{InstanceTracker, SkipReason, TrackerConfig};
pub use types::{CardKind, EndReason, ScanState};
