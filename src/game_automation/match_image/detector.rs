//! Card detection over the battle report log

use super::{config::DetectorConfig, region::SearchRegion};
use crate::game_automation::types::CardKind;
use crate::template_matching::{
    Match, MatchConfig, TemplateLibrary, TemplateMatcher, create_marker_config,
};
use image::GrayImage;
use serde::Serialize;
use std::cmp::Ordering;

/// One detection of a card template in one frame, in absolute screen coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSighting {
    pub name: String,
    pub kind: CardKind,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
    pub scale: f32,
}

impl CardSighting {
    fn from_match(m: Match, kind: CardKind, region: &SearchRegion) -> Self {
        let (x, y) = region.to_absolute(m.x, m.y);
        Self {
            name: m.template_name,
            kind,
            x,
            y,
            width: m.width,
            height: m.height,
            confidence: m.confidence,
            scale: m.scale,
        }
    }

    pub fn distance_to(&self, other: &CardSighting) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, (dx, dy): (i32, i32)) -> (i32, i32) {
        (self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    /// Sightings in reading order (top to bottom, then left to right)
    pub sightings: Vec<CardSighting>,
    pub processing_time_ms: u128,
}

impl DetectionResult {
    pub fn has_sightings(&self) -> bool {
        !self.sightings.is_empty()
    }

    pub fn of_kind(&self, kind: CardKind) -> impl Iterator<Item = &CardSighting> {
        self.sightings.iter().filter(move |s| s.kind == kind)
    }
}

/// Collapse same-name sightings closer than `distance`, keeping the most confident
///
/// Returns the survivors in reading order.
pub fn suppress_nearby(mut sightings: Vec<CardSighting>, distance: f32) -> Vec<CardSighting> {
    sightings.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<CardSighting> = Vec::with_capacity(sightings.len());
    for candidate in sightings {
        let duplicate = keep.iter().any(|kept| {
            kept.kind == candidate.kind
                && kept.name == candidate.name
                && kept.distance_to(&candidate) < distance
        });
        if !duplicate {
            keep.push(candidate);
        }
    }

    keep.sort_by_key(|s| (s.y, s.x));
    keep
}

/// Finds hero and captain cards in captures of the log region
pub struct CardDetector {
    matcher: TemplateMatcher,
    marker_matcher: TemplateMatcher,
    config: DetectorConfig,
    heroes: TemplateLibrary,
    captains: TemplateLibrary,
}

impl CardDetector {
    pub fn new(
        match_config: MatchConfig,
        config: DetectorConfig,
        heroes: TemplateLibrary,
        captains: TemplateLibrary,
    ) -> Self {
        let marker_matcher = TemplateMatcher::new(MatchConfig {
            method: match_config.method,
            ..create_marker_config()
        });
        Self {
            matcher: TemplateMatcher::new(match_config),
            marker_matcher,
            config,
            heroes,
            captains,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn library(&self, kind: CardKind) -> &TemplateLibrary {
        match kind {
            CardKind::Hero => &self.heroes,
            CardKind::Captain => &self.captains,
        }
    }

    /// Detect one card category inside `region`
    ///
    /// `screenshot` was captured at `origin`; when both are the same region no crop is made.
    /// Sightings below the confidence floor are dropped.
    pub fn detect(
        &self,
        screenshot: &GrayImage,
        origin: &SearchRegion,
        region: &SearchRegion,
        library: &TemplateLibrary,
        kind: CardKind,
    ) -> Vec<CardSighting> {
        let cropped;
        let (search, search_origin) = if region == origin {
            (screenshot, origin)
        } else {
            match region.crop_gray(screenshot, origin) {
                Some(image) => {
                    cropped = image;
                    (&cropped, region)
                }
                None => {
                    log::warn!("⚠️ Region {} lies outside capture {}", region, origin);
                    return Vec::new();
                }
            }
        };

        // Cropping may have clipped the region; offsets follow the clipped origin
        let search_origin = SearchRegion::new(
            search_origin.x.max(origin.x),
            search_origin.y.max(origin.y),
            search.width(),
            search.height(),
            search_origin.name.clone(),
        );

        self.matcher
            .find_all(search, library, self.config.enable_multiscale)
            .into_values()
            .flatten()
            .filter(|m| m.confidence >= self.config.confidence_floor)
            .map(|m| CardSighting::from_match(m, kind, &search_origin))
            .collect()
    }

    /// Detect heroes and captains, collapse near-duplicates and order for processing
    pub fn detect_all(
        &self,
        screenshot: &GrayImage,
        origin: &SearchRegion,
        region: &SearchRegion,
    ) -> DetectionResult {
        let start_time = std::time::Instant::now();

        let mut sightings = self.detect(screenshot, origin, region, &self.heroes, CardKind::Hero);
        sightings.extend(self.detect(
            screenshot,
            origin,
            region,
            &self.captains,
            CardKind::Captain,
        ));

        let result = DetectionResult {
            sightings: suppress_nearby(sightings, self.config.duplicate_distance),
            processing_time_ms: start_time.elapsed().as_millis(),
        };
        self.log_detection_results(&result);
        result
    }

    /// Strongest match of any template in a marker family
    pub fn find_marker(
        &self,
        screenshot: &GrayImage,
        markers: &TemplateLibrary,
        threshold: f32,
    ) -> Option<Match> {
        markers
            .enabled()
            .filter_map(|template| {
                let threshold = template.threshold.unwrap_or(threshold);
                self.marker_matcher
                    .find_best_match(screenshot, &template.image, threshold, false)
                    .map(|mut m| {
                        m.template_name = template.name.clone();
                        m
                    })
            })
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(Ordering::Equal)
            })
    }

    fn log_detection_results(&self, result: &DetectionResult) {
        log::debug!(
            "🔍 Detection: {} sightings in {}ms",
            result.sightings.len(),
            result.processing_time_ms
        );
        for (i, s) in result.sightings.iter().take(12).enumerate() {
            log::debug!(
                "    {}. {} {} at ({},{}) conf={:.3} scale={:.2}",
                i + 1,
                s.kind,
                s.name,
                s.x,
                s.y,
                s.confidence,
                s.scale
            );
        }
    }
}
