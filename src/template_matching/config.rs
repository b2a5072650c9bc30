//! Configuration for template matching operations

use super::types::{MatchMethod, Template};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Range of template scale factors searched by multi-scale matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleRange {
    pub enabled: bool,
    pub min_scale: f32,
    pub max_scale: f32,
    pub scale_step: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            enabled: true,
            min_scale: 0.9,
            max_scale: 1.1,
            scale_step: 0.05,
        }
    }
}

impl ScaleRange {
    /// Scale factors from `min_scale` to `max_scale` inclusive
    ///
    /// The count is computed up front so float drift never adds or drops the last step.
    pub fn factors(&self) -> Vec<f32> {
        if !self.enabled || self.scale_step <= 0.0 || self.max_scale < self.min_scale {
            return vec![1.0];
        }
        let steps = ((self.max_scale - self.min_scale) / self.scale_step).round() as u32;
        (0..=steps)
            .map(|i| self.min_scale + i as f32 * self.scale_step)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Confidence threshold for template matching (0.0 to 1.0)
    pub default_threshold: f32,
    pub method: MatchMethod,
    pub multiscale: ScaleRange,
    /// Candidates overlapping a stronger one by more than this IoU are dropped
    pub nms_iou_threshold: f32,
    /// Scaled templates narrower or shorter than this are skipped
    pub min_template_side: u32,
    /// Per-template threshold overrides, keyed by template name
    pub custom_thresholds: BTreeMap<String, f32>,
    /// Templates loaded but excluded from matching
    pub disabled_templates: BTreeSet<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.78,
            method: MatchMethod::CorrelationCoefficientNormalized,
            multiscale: ScaleRange::default(),
            nms_iou_threshold: 0.5,
            min_template_side: 10,
            custom_thresholds: BTreeMap::new(),
            disabled_templates: BTreeSet::new(),
        }
    }
}

impl MatchConfig {
    /// Apply per-template threshold overrides and enabled flags
    pub fn configure(&self, mut template: Template) -> Template {
        if let Some(&threshold) = self.custom_thresholds.get(&template.name) {
            template = template.with_threshold(threshold);
        }
        template.enabled = !self.disabled_templates.contains(&template.name);
        template
    }
}

/// Configuration tuned for the battle report log: slightly lower threshold, narrow scale band
///
/// Same as `MatchConfig::default()`, so a partial JSON `matcher` section keeps these values.
pub fn create_card_config() -> MatchConfig {
    MatchConfig::default()
}

/// Configuration for single-scale marker checks (start marker, end-of-report marker)
pub fn create_marker_config() -> MatchConfig {
    let card = MatchConfig::default();
    MatchConfig {
        default_threshold: 0.8,
        multiscale: ScaleRange {
            enabled: false,
            ..card.multiscale.clone()
        },
        ..card
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_scale_factors_inclusive() {
        let range = ScaleRange {
            enabled: true,
            min_scale: 0.9,
            max_scale: 1.1,
            scale_step: 0.05,
        };
        let factors = range.factors();
        assert_eq!(factors.len(), 5, "0.9, 0.95, 1.0, 1.05, 1.1");
        assert!((factors[0] - 0.9).abs() < 1e-6);
        assert!((factors[4] - 1.1).abs() < 1e-5);
    }

    #[test]
    fn test_scale_factors_disabled() {
        let range = ScaleRange {
            enabled: false,
            ..ScaleRange::default()
        };
        assert_eq!(range.factors(), vec![1.0]);
    }

    #[test]
    fn test_configure_applies_overrides() {
        let mut config = MatchConfig::default();
        config.custom_thresholds.insert("haemon".to_string(), 0.9);
        config.disabled_templates.insert("broken".to_string());

        let haemon = config.configure(Template::new("haemon", GrayImage::new(12, 12)));
        assert_eq!(haemon.threshold, Some(0.9));
        assert!(haemon.enabled);

        let broken = config.configure(Template::new("broken", GrayImage::new(12, 12)));
        assert!(!broken.enabled);
        assert_eq!(broken.effective_threshold(config.default_threshold), 0.78);
    }

    #[test]
    fn test_card_config_defaults() {
        let config = create_card_config();
        assert_eq!(config.default_threshold, 0.78);
        assert_eq!(config.multiscale.factors().len(), 5);
        assert_eq!(config.nms_iou_threshold, 0.5);
    }

    #[test]
    fn test_marker_config_is_single_scale() {
        let config = create_marker_config();
        assert_eq!(config.default_threshold, 0.8);
        assert_eq!(config.multiscale.factors(), vec![1.0], "Markers match at native size");
        assert_eq!(config.method, MatchConfig::default().method);
    }
}
