//! Instance tracker: decides whether a card sighting is a new player or a re-sighting
//!
//! Sightings are cheap and arrive every frame; labels (gametags) are only known after a
//! card was clicked. Each hero therefore has at most one unconfirmed entry that never
//! blocks anything, and confirmed `(hero, label)` entries that block nearby or recent
//! sightings of the same hero. Distinct labels on the same hero never block each other.

use super::report::TrackerStats;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sightings of a confirmed hero closer than this (vertically) are the same card
    pub y_tolerance: i32,
    /// Seconds after any confirmation of a hero during which it is not clicked again
    pub cooldown_secs: u64,
    /// Seconds during which a confirmed card blocks sightings anywhere on screen
    pub processed_lock_secs: u64,
    /// `needs_scroll` once processing got this far below the first sighting
    pub scroll_threshold: i32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            y_tolerance: 320,
            cooldown_secs: 60,
            processed_lock_secs: 45,
            scroll_threshold: 250,
        }
    }
}

/// Label component of the identity key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKey {
    Unknown,
    Confirmed(String),
}

impl LabelKey {
    fn from_label(label: Option<&str>) -> Self {
        match label.map(normalize).filter(|l| !l.is_empty()) {
            Some(l) => LabelKey::Confirmed(l),
            None => LabelKey::Unknown,
        }
    }
}

pub type IdentityKey = (String, LabelKey);

/// One believed-unique card instance
#[derive(Debug, Clone)]
pub struct SeenCard {
    pub hero_name: String,
    /// Label as read (trimmed, original casing); `None` until confirmed
    pub label: Option<String>,
    pub last_seen: Instant,
    pub y_center: i32,
    pub processed: bool,
}

/// A click whose label could not be read
#[derive(Debug, Clone)]
struct FailedRead {
    y_center: i32,
    at: Instant,
    attempts: u32,
}

/// Why a sighting is not processed
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The hero was confirmed moments ago
    Cooldown { elapsed: Duration },
    /// A confirmed card of this hero is still locked
    RecentlyConfirmed { label: String, elapsed: Duration },
    /// A confirmed card of this hero sits in the same vertical band
    SameCard { label: String, dy: i32 },
    /// The label of this card could not be read recently
    UnreadableLabel { dy: i32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Cooldown { elapsed } => {
                write!(f, "cooldown ({:.1}s since last confirmation)", elapsed.as_secs_f32())
            }
            SkipReason::RecentlyConfirmed { label, elapsed } => {
                write!(f, "'{}' confirmed {:.1}s ago", label, elapsed.as_secs_f32())
            }
            SkipReason::SameCard { label, dy } => write!(f, "same card as '{}' (dy={})", label, dy),
            SkipReason::UnreadableLabel { dy } => write!(f, "unreadable label nearby (dy={})", dy),
        }
    }
}

pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct InstanceTracker {
    config: TrackerConfig,
    seen: BTreeMap<IdentityKey, SeenCard>,
    /// Normalized labels of every confirmed card
    labels: BTreeSet<String>,
    /// Per hero: latest confirmation or failed read
    last_processed: BTreeMap<String, Instant>,
    failed_reads: BTreeMap<String, FailedRead>,
    min_y_seen: Option<i32>,
    max_y_processed: Option<i32>,
}

impl InstanceTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn add_detection(&mut self, hero_name: &str, y_center: i32) {
        self.add_detection_at(hero_name, y_center, Instant::now());
    }

    /// Record or refresh the unconfirmed entry of a hero
    pub fn add_detection_at(&mut self, hero_name: &str, y_center: i32, now: Instant) {
        self.min_y_seen = Some(self.min_y_seen.map_or(y_center, |min| min.min(y_center)));

        let key = (normalize(hero_name), LabelKey::Unknown);
        self.seen
            .entry(key)
            .and_modify(|card| {
                card.last_seen = now;
                card.y_center = y_center;
            })
            .or_insert_with(|| SeenCard {
                hero_name: hero_name.trim().to_string(),
                label: None,
                last_seen: now,
                y_center,
                processed: false,
            });
    }

    pub fn should_process(&self, hero_name: &str, y_center: i32) -> bool {
        self.should_process_at(hero_name, y_center, Instant::now())
    }

    pub fn should_process_at(&self, hero_name: &str, y_center: i32, now: Instant) -> bool {
        self.skip_reason_at(hero_name, y_center, now).is_none()
    }

    /// Reason to skip a sighting, or `None` when it should be clicked
    ///
    /// Only confirmed entries and failed reads block; unconfirmed entries never do.
    pub fn skip_reason_at(&self, hero_name: &str, y_center: i32, now: Instant) -> Option<SkipReason> {
        let hero_key = normalize(hero_name);
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        let lock = Duration::from_secs(self.config.processed_lock_secs);

        if let Some(last) = self.last_processed.get(&hero_key) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                return Some(SkipReason::Cooldown { elapsed });
            }
        }

        let confirmed = self
            .seen
            .range((hero_key.clone(), LabelKey::Unknown)..)
            .take_while(|((hero, _), _)| *hero == hero_key)
            .filter(|(_, card)| card.processed);

        for ((_, label), card) in confirmed {
            let LabelKey::Confirmed(label) = label else {
                continue;
            };
            let elapsed = now.saturating_duration_since(card.last_seen);
            if elapsed < lock {
                return Some(SkipReason::RecentlyConfirmed {
                    label: label.clone(),
                    elapsed,
                });
            }
            let dy = (y_center - card.y_center).abs();
            if dy < self.config.y_tolerance {
                return Some(SkipReason::SameCard {
                    label: label.clone(),
                    dy,
                });
            }
        }

        if let Some(failed) = self.failed_reads.get(&hero_key) {
            let dy = (y_center - failed.y_center).abs();
            if now.saturating_duration_since(failed.at) < lock || dy < self.config.y_tolerance {
                return Some(SkipReason::UnreadableLabel { dy });
            }
        }

        None
    }

    pub fn mark_processed(&mut self, hero_name: &str, y_center: i32, label: Option<&str>) {
        self.mark_processed_at(hero_name, y_center, label, Instant::now());
    }

    /// Confirm a hero card after its panel was read
    ///
    /// With a label, the unconfirmed entry of the hero merges into `(hero, label)`.
    /// Without one, the attempt is remembered so the same card is not clicked over and
    /// over, but no identity is created.
    pub fn mark_processed_at(
        &mut self,
        hero_name: &str,
        y_center: i32,
        label: Option<&str>,
        now: Instant,
    ) {
        let hero_key = normalize(hero_name);
        let unknown = self.seen.remove(&(hero_key.clone(), LabelKey::Unknown));

        match LabelKey::from_label(label) {
            LabelKey::Confirmed(label_key) => {
                let display = label.map(str::trim).unwrap_or_default().to_string();
                let hero_display = unknown
                    .map(|card| card.hero_name)
                    .unwrap_or_else(|| hero_name.trim().to_string());

                self.seen
                    .entry((hero_key.clone(), LabelKey::Confirmed(label_key.clone())))
                    .and_modify(|card| {
                        card.last_seen = now;
                        card.y_center = y_center;
                        card.processed = true;
                    })
                    .or_insert_with(|| SeenCard {
                        hero_name: hero_display,
                        label: Some(display),
                        last_seen: now,
                        y_center,
                        processed: true,
                    });
                self.labels.insert(label_key);
                self.failed_reads.remove(&hero_key);
            }
            LabelKey::Unknown => {
                self.failed_reads
                    .entry(hero_key.clone())
                    .and_modify(|failed| {
                        failed.y_center = y_center;
                        failed.at = now;
                        failed.attempts += 1;
                    })
                    .or_insert(FailedRead {
                        y_center,
                        at: now,
                        attempts: 1,
                    });
            }
        }

        self.max_y_processed = Some(self.max_y_processed.map_or(y_center, |max| max.max(y_center)));
        self.last_processed.insert(hero_key, now);
    }

    /// Processing has moved well past the first sighting; scroll harder
    pub fn needs_scroll(&self) -> bool {
        match (self.min_y_seen, self.max_y_processed) {
            (Some(min), Some(max)) => max > min + self.config.scroll_threshold,
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.labels.clear();
        self.last_processed.clear();
        self.failed_reads.clear();
        self.min_y_seen = None;
        self.max_y_processed = None;
        log::info!("🔄 Instance tracker reset");
    }

    pub fn get(&self, hero_name: &str, label: Option<&str>) -> Option<&SeenCard> {
        self.seen.get(&(normalize(hero_name), LabelKey::from_label(label)))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn knows_label(&self, label: &str) -> bool {
        self.labels.contains(&normalize(label))
    }

    pub fn unique_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            active_instances: self.seen.len(),
            processed_heroes: self.seen.values().filter(|c| c.processed).count(),
            unique_labels: self.labels.len(),
            labels: self.labels.iter().cloned().collect(),
            failed_reads: self.failed_reads.values().map(|f| f.attempts as usize).sum(),
            min_y_seen: self.min_y_seen,
            max_y_processed: self.max_y_processed,
        }
    }
}
