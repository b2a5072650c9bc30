//! Graduated scroll policy for the scan loop

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One scroll action followed by a settle pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollStep {
    /// Wheel amount; negative scrolls the log down
    pub amount: i32,
    pub settle_ms: u64,
}

impl ScrollStep {
    pub const fn new(amount: i32, settle_ms: u64) -> Self {
        Self { amount, settle_ms }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn magnitude(&self) -> u32 {
        self.amount.unsigned_abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// No cards in the frame at all
    pub empty_frame: ScrollStep,
    /// Nothing new and the content did not move since the last frame
    pub stuck: ScrollStep,
    /// Nothing new and the tracker reports the visible cards exhausted
    pub exhausted: ScrollStep,
    /// Nothing new, content moved
    pub all_skipped: ScrollStep,
    /// At least one card processed
    pub progress: ScrollStep,
    /// Stop after more than this many consecutive frames without progress
    pub no_progress_limit: u32,
    /// Stop after this many frames
    pub max_frames: u32,
    /// Downsampling factor of the content hash
    pub hash_precision: u32,
    /// Captures spent looking for the start marker
    pub start_marker_attempts: u32,
    pub start_search_step: ScrollStep,
    /// Scroll past the marker header once found
    pub start_found_step: ScrollStep,
    /// Small scroll lining up the first row of cards
    pub align_step: ScrollStep,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            empty_frame: ScrollStep::new(-30, 500),
            stuck: ScrollStep::new(-60, 1200),
            exhausted: ScrollStep::new(-50, 1000),
            all_skipped: ScrollStep::new(-40, 1000),
            progress: ScrollStep::new(-25, 1000),
            no_progress_limit: 10,
            max_frames: 50,
            hash_precision: 8,
            start_marker_attempts: 60,
            start_search_step: ScrollStep::new(-10, 500),
            start_found_step: ScrollStep::new(-5, 500),
            align_step: ScrollStep::new(-2, 500),
        }
    }
}

/// What one scanned frame produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameOutcome {
    pub cards_found: usize,
    pub cards_processed: usize,
    pub content_unchanged: bool,
    pub needs_scroll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDecision {
    EmptyFrame,
    Stuck,
    Exhausted,
    AllSkipped,
    Progress,
}

impl ScrollDecision {
    pub fn for_frame(frame: &FrameOutcome) -> Self {
        if frame.cards_found == 0 {
            ScrollDecision::EmptyFrame
        } else if frame.cards_processed > 0 {
            ScrollDecision::Progress
        } else if frame.content_unchanged {
            ScrollDecision::Stuck
        } else if frame.needs_scroll {
            ScrollDecision::Exhausted
        } else {
            ScrollDecision::AllSkipped
        }
    }

    pub fn step(&self, config: &ScrollConfig) -> ScrollStep {
        match self {
            ScrollDecision::EmptyFrame => config.empty_frame,
            ScrollDecision::Stuck => config.stuck,
            ScrollDecision::Exhausted => config.exhausted,
            ScrollDecision::AllSkipped => config.all_skipped,
            ScrollDecision::Progress => config.progress,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ScrollDecision::EmptyFrame => "no cards found",
            ScrollDecision::Stuck => "content stagnant, aggressive scroll",
            ScrollDecision::Exhausted => "all cards done, tracker wants a bigger step",
            ScrollDecision::AllSkipped => "all cards skipped, advancing",
            ScrollDecision::Progress => "new cards processed",
        }
    }
}

/// Chooses scroll steps and counts frames without progress
#[derive(Debug, Clone)]
pub struct ScrollPolicy {
    config: ScrollConfig,
    no_progress: u32,
}

impl ScrollPolicy {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            no_progress: 0,
        }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Decide the scroll after a frame and update the no-progress counter
    pub fn next_step(&mut self, frame: &FrameOutcome) -> (ScrollDecision, ScrollStep) {
        let decision = ScrollDecision::for_frame(frame);
        if decision == ScrollDecision::Progress {
            self.no_progress = 0;
        } else {
            self.no_progress += 1;
        }
        (decision, decision.step(&self.config))
    }

    pub fn no_progress_count(&self) -> u32 {
        self.no_progress
    }

    pub fn no_progress_exceeded(&self) -> bool {
        self.no_progress > self.config.no_progress_limit
    }

    pub fn reset(&mut self) {
        self.no_progress = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(found: usize, processed: usize, unchanged: bool, needs_scroll: bool) -> FrameOutcome {
        FrameOutcome {
            cards_found: found,
            cards_processed: processed,
            content_unchanged: unchanged,
            needs_scroll,
        }
    }

    #[test]
    fn test_decision_branches() {
        assert_eq!(ScrollDecision::for_frame(&frame(0, 0, true, true)), ScrollDecision::EmptyFrame);
        assert_eq!(ScrollDecision::for_frame(&frame(5, 1, true, true)), ScrollDecision::Progress);
        assert_eq!(ScrollDecision::for_frame(&frame(5, 0, true, true)), ScrollDecision::Stuck);
        assert_eq!(ScrollDecision::for_frame(&frame(5, 0, false, true)), ScrollDecision::Exhausted);
        assert_eq!(ScrollDecision::for_frame(&frame(5, 0, false, false)), ScrollDecision::AllSkipped);
    }

    #[test]
    fn test_stuck_scrolls_harder_than_changed() {
        let mut policy = ScrollPolicy::new(ScrollConfig::default());
        let (_, changed) = policy.next_step(&frame(4, 0, false, false));
        let (_, changed_exhausted) = policy.next_step(&frame(4, 0, false, true));
        let (_, stuck) = policy.next_step(&frame(4, 0, true, false));

        assert!(stuck.magnitude() > changed.magnitude());
        assert!(stuck.magnitude() > changed_exhausted.magnitude());
        assert!(changed_exhausted.magnitude() > changed.magnitude());
        assert!(stuck.amount < 0, "Scans move down the log");
    }

    #[test]
    fn test_no_progress_counter() {
        let mut policy = ScrollPolicy::new(ScrollConfig::default());
        for _ in 0..10 {
            policy.next_step(&frame(3, 0, true, false));
        }
        assert_eq!(policy.no_progress_count(), 10);
        assert!(!policy.no_progress_exceeded(), "Cap is exclusive");

        policy.next_step(&frame(0, 0, false, false));
        assert!(policy.no_progress_exceeded());

        policy.next_step(&frame(3, 2, false, false));
        assert_eq!(policy.no_progress_count(), 0, "Progress resets the counter");
    }
}
