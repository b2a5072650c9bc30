// Scan results handed to the reporting layer
use super::types::EndReason;
use serde::Serialize;
use std::time::Duration;

/// One confirmed player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    /// Label (gametag) as read
    pub label: String,
    pub hero_name: String,
    /// Captains outside the allowed list seen next to this player's hero
    pub forbidden_captains: Vec<String>,
    /// Captains whose panel showed armor
    pub captains_with_armor: Vec<String>,
    /// Screen position where the hero card was first confirmed
    pub position: (i32, i32),
}

impl Participant {
    pub fn new(label: impl Into<String>, hero_name: impl Into<String>, position: (i32, i32)) -> Self {
        Self {
            label: label.into(),
            hero_name: hero_name.into(),
            forbidden_captains: Vec::new(),
            captains_with_armor: Vec::new(),
            position,
        }
    }

    pub fn add_forbidden_captain(&mut self, captain: &str) {
        if !self.forbidden_captains.iter().any(|c| c == captain) {
            self.forbidden_captains.push(captain.to_string());
        }
    }

    pub fn add_captain_with_armor(&mut self, captain: &str) {
        if !self.captains_with_armor.iter().any(|c| c == captain) {
            self.captains_with_armor.push(captain.to_string());
        }
    }

    pub fn has_violations(&self) -> bool {
        !self.forbidden_captains.is_empty() || !self.captains_with_armor.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerStats {
    pub active_instances: usize,
    pub processed_heroes: usize,
    pub unique_labels: usize,
    /// Normalized labels, sorted
    pub labels: Vec<String>,
    pub failed_reads: usize,
    pub min_y_seen: Option<i32>,
    pub max_y_processed: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub participants: Vec<Participant>,
    pub tracker: TrackerStats,
    pub frames_scanned: u32,
    pub end_reason: EndReason,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn participant(&self, label: &str) -> Option<&Participant> {
        let label = label.trim().to_lowercase();
        self.participants
            .iter()
            .find(|p| p.label.trim().to_lowercase() == label)
    }

    /// Log a human-readable summary
    pub fn log_summary(&self) {
        log::info!("📊 Scan finished: {}", self.end_reason.describe());
        log::info!(
            "   {} participants, {} unique labels, {} frames in {:.1}s",
            self.participants.len(),
            self.tracker.unique_labels,
            self.frames_scanned,
            self.elapsed.as_secs_f32()
        );
        if self.tracker.failed_reads > 0 {
            log::warn!("   ⚠️ {} label reads failed", self.tracker.failed_reads);
        }
        for (i, p) in self.participants.iter().enumerate() {
            let mut line = format!("   {}. {} ({})", i + 1, p.label, p.hero_name);
            if !p.forbidden_captains.is_empty() {
                line.push_str(&format!(" 🚫 {}", p.forbidden_captains.join(", ")));
            }
            if !p.captains_with_armor.is_empty() {
                line.push_str(&format!(" 🛡️ {}", p.captains_with_armor.join(", ")));
            }
            log::info!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_deduplicates_captains() {
        let mut p = Participant::new("PlayerX", "haemon", (600, 500));
        assert!(!p.has_violations());

        p.add_forbidden_captain("sergios");
        p.add_forbidden_captain("sergios");
        p.add_captain_with_armor("sergios");
        assert_eq!(p.forbidden_captains, vec!["sergios"]);
        assert_eq!(p.captains_with_armor, vec!["sergios"]);
        assert!(p.has_violations());
    }

    #[test]
    fn test_report_lookup_ignores_case() {
        let report = ScanReport {
            participants: vec![Participant::new("PlayerX", "haemon", (0, 0))],
            tracker: TrackerStats::default(),
            frames_scanned: 3,
            end_reason: EndReason::EndMarker,
            elapsed: Duration::from_secs(12),
            cancelled: false,
        };
        assert!(report.participant(" playerx ").is_some());
        assert!(report.participant("PlayerY").is_none());
    }
}
