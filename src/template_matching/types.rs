/// Template matching data types
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scoring function used to compare a template against every window of the search image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Zero-mean normalized cross correlation, range [-1, 1], insensitive to brightness offsets
    #[default]
    CorrelationCoefficientNormalized,
    /// Normalized cross correlation without mean removal, range [0, 1]
    CrossCorrelationNormalized,
    /// Normalized sum of squared differences, lower is better
    SquaredDifferenceNormalized,
}

impl MatchMethod {
    /// Difference-style methods report 0.0 for a perfect match
    pub fn is_difference(&self) -> bool {
        matches!(self, MatchMethod::SquaredDifferenceNormalized)
    }

    /// Short name used in logs
    pub fn label(&self) -> &'static str {
        match self {
            MatchMethod::CorrelationCoefficientNormalized => "CCOEFF_NORMED",
            MatchMethod::CrossCorrelationNormalized => "CCORR_NORMED",
            MatchMethod::SquaredDifferenceNormalized => "SQDIFF_NORMED",
        }
    }
}

/// A named reference image
#[derive(Clone, Debug)]
pub struct Template {
    /// Template name (file stem, e.g. "haemon")
    pub name: String,
    /// Grayscale pixels
    pub image: GrayImage,
    /// Threshold override; the matcher default applies when `None`
    pub threshold: Option<f32>,
    /// Disabled templates are never searched
    pub enabled: bool,
}

impl Template {
    pub fn new(name: impl Into<String>, image: GrayImage) -> Self {
        Self {
            name: name.into(),
            image,
            threshold: None,
            enabled: true,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Threshold to use for this template given the matcher default
    pub fn effective_threshold(&self, default_threshold: f32) -> f32 {
        self.threshold.unwrap_or(default_threshold)
    }
}

/// Templates of one category (heroes, captains, markers), keyed by name
#[derive(Clone, Debug, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Templates that take part in matching, in name order
    pub fn enabled(&self) -> impl Iterator<Item = &Template> {
        self.templates.values().filter(|t| t.enabled)
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<Template> for TemplateLibrary {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        let mut library = TemplateLibrary::new();
        for template in iter {
            library.insert(template);
        }
        library
    }
}

/// A single match result
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    /// Name of the template that produced this match (empty for anonymous templates)
    pub template_name: String,
    /// X coordinate of the top-left corner in the search image
    pub x: u32,
    /// Y coordinate of the top-left corner in the search image
    pub y: u32,
    /// Width of the (scaled) template footprint
    pub width: u32,
    /// Height of the (scaled) template footprint
    pub height: u32,
    /// Confidence (0.0-1.0), higher is always better regardless of method
    pub confidence: f32,
    /// Scale factor applied to the template
    pub scale: f32,
    pub method: MatchMethod,
}

impl Match {
    pub fn area(&self) -> f32 {
        (self.width * self.height) as f32
    }

    /// Intersection over union of the two footprints
    pub fn iou(&self, other: &Match) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = ((x2 - x1) * (y2 - y1)) as f32;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Format match as string with confidence percentage
    pub fn describe(&self) -> String {
        let name = if self.template_name.is_empty() {
            "unnamed"
        } else {
            &self.template_name
        };
        format!(
            "{} at ({},{}) {}x{} - {}% @{:.2}x",
            name,
            self.x,
            self.y,
            self.width,
            self.height,
            (self.confidence * 100.0) as u32,
            self.scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint(x: u32, y: u32, size: u32) -> Match {
        Match {
            template_name: "t".to_string(),
            x,
            y,
            width: size,
            height: size,
            confidence: 0.9,
            scale: 1.0,
            method: MatchMethod::default(),
        }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = footprint(10, 10, 20);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = footprint(0, 0, 10);
        let b = footprint(10, 0, 10);
        assert_eq!(a.iou(&b), 0.0, "Touching edges do not overlap");
    }

    #[test]
    fn test_iou_half_shift() {
        // 20x20 boxes shifted by 10px horizontally: 200 / (400 + 400 - 200)
        let a = footprint(0, 0, 20);
        let b = footprint(10, 0, 20);
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_library_skips_disabled() {
        let mut disabled = Template::new("b", GrayImage::new(4, 4));
        disabled.enabled = false;
        let library: TemplateLibrary =
            vec![Template::new("a", GrayImage::new(4, 4)), disabled].into_iter().collect();

        assert_eq!(library.len(), 2);
        let enabled: Vec<&str> = library.enabled().map(|t| t.name.as_str()).collect();
        assert_eq!(enabled, vec!["a"]);
    }

    #[test]
    fn test_difference_method_flag() {
        assert!(MatchMethod::SquaredDifferenceNormalized.is_difference());
        assert!(!MatchMethod::CorrelationCoefficientNormalized.is_difference());
        assert!(!MatchMethod::CrossCorrelationNormalized.is_difference());
    }
}
