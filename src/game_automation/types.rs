// Types and enums for the battle report scan
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanState {
    Idle,
    SearchingForStart,
    Scanning,
    Finished(EndReason),
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Finished(_))
    }
}

/// Card category; each has its own template library
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CardKind {
    Hero,
    Captain,
}

impl CardKind {
    pub fn label(&self) -> &'static str {
        match self {
            CardKind::Hero => "hero",
            CardKind::Captain => "captain",
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a scan session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// End-of-report marker seen and the final frame processed
    EndMarker,
    /// Too many consecutive frames without a newly processed card
    NoProgress,
    /// Frame cap reached without a terminator
    FrameLimit,
    /// The start marker never appeared
    StartMarkerNotFound,
    /// User stop signal
    Cancelled,
}

impl EndReason {
    /// Whether the report end was actually reached
    pub fn has_terminator(&self) -> bool {
        matches!(self, EndReason::EndMarker)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            EndReason::EndMarker => "end marker reached",
            EndReason::NoProgress => "ended without explicit terminator (no progress)",
            EndReason::FrameLimit => "ended without explicit terminator (frame limit)",
            EndReason::StartMarkerNotFound => "start marker not found",
            EndReason::Cancelled => "cancelled by user",
        }
    }
}
