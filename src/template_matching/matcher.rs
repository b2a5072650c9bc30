/// Template matching implementation
///
/// Normalized correlation matching across a range of template scales, followed by
/// greedy non-maximum suppression
use super::config::MatchConfig;
use super::nms::suppress_overlapping;
use super::types::{Match, MatchMethod, TemplateLibrary};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use std::collections::BTreeMap;

type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;
type SumTable = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Convert any capture to grayscale, dropping alpha before the luma conversion
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => DynamicImage::ImageRgb8(other.to_rgb8()).to_luma8(),
    }
}

/// Template matcher for finding templates in screenshots
pub struct TemplateMatcher {
    config: MatchConfig,
}

impl TemplateMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Find every location where `template` matches `image` at its native size
    ///
    /// Returns matches after suppression, sorted by confidence (highest first).
    /// The template name is left empty; named entry points fill it in.
    pub fn match_template(
        &self,
        image: &GrayImage,
        template: &GrayImage,
        threshold: f32,
        method: MatchMethod,
    ) -> Vec<Match> {
        let candidates = self.candidates(image, template, threshold, method, 1.0);
        suppress_overlapping(candidates, self.config.nms_iou_threshold)
    }

    /// Find `template` at every configured scale
    ///
    /// Scaled templates smaller than the minimum side are skipped. Candidates from all
    /// scales go through one suppression pass so near-identical hits at neighbouring
    /// scales collapse into the strongest one.
    pub fn match_multiscale(
        &self,
        image: &GrayImage,
        template: &GrayImage,
        name: &str,
        threshold: f32,
    ) -> Vec<Match> {
        let method = self.config.method;
        if !self.config.multiscale.enabled {
            return self.named(self.match_template(image, template, threshold, method), name);
        }

        let mut all_matches = Vec::new();
        for scale in self.config.multiscale.factors() {
            let width = (template.width() as f32 * scale).round() as u32;
            let height = (template.height() as f32 * scale).round() as u32;

            if width < self.config.min_template_side || height < self.config.min_template_side {
                log::debug!(
                    "⚠️ Skipping {} @{:.2}x: scaled to {}x{}",
                    name,
                    scale,
                    width,
                    height
                );
                continue;
            }

            let candidates = if width == template.width() && height == template.height() {
                self.candidates(image, template, threshold, method, scale)
            } else {
                let resized = imageops::resize(template, width, height, FilterType::Triangle);
                self.candidates(image, &resized, threshold, method, scale)
            };
            all_matches.extend(candidates);
        }

        let kept = suppress_overlapping(all_matches, self.config.nms_iou_threshold);
        self.named(kept, name)
    }

    /// Search every enabled template of a library
    ///
    /// Templates without matches are absent from the result. An empty image or an
    /// empty library yields an empty map.
    pub fn find_all(
        &self,
        image: &GrayImage,
        library: &TemplateLibrary,
        multiscale: bool,
    ) -> BTreeMap<String, Vec<Match>> {
        let mut results = BTreeMap::new();
        if image.width() == 0 || image.height() == 0 {
            return results;
        }

        for template in library.enabled() {
            let threshold = template.effective_threshold(self.config.default_threshold);
            let matches = if multiscale {
                self.match_multiscale(image, &template.image, &template.name, threshold)
            } else {
                let found =
                    self.match_template(image, &template.image, threshold, self.config.method);
                self.named(found, &template.name)
            };

            if !matches.is_empty() {
                log::debug!("✅ Found {} matches for template '{}'", matches.len(), template.name);
                results.insert(template.name.clone(), matches);
            }
        }

        results
    }

    /// Strongest match of one template, if any passes the threshold
    pub fn find_best_match(
        &self,
        image: &GrayImage,
        template: &GrayImage,
        threshold: f32,
        multiscale: bool,
    ) -> Option<Match> {
        let matches = if multiscale {
            self.match_multiscale(image, template, "", threshold)
        } else {
            self.match_template(image, template, threshold, self.config.method)
        };
        // Suppression output is sorted by confidence
        matches.into_iter().next()
    }

    fn named(&self, mut matches: Vec<Match>, name: &str) -> Vec<Match> {
        for m in &mut matches {
            m.template_name = name.to_string();
        }
        matches
    }

    /// Every window position passing the threshold, before suppression
    fn candidates(
        &self,
        image: &GrayImage,
        template: &GrayImage,
        threshold: f32,
        method: MatchMethod,
        scale: f32,
    ) -> Vec<Match> {
        if template.width() == 0
            || template.height() == 0
            || template.width() > image.width()
            || template.height() > image.height()
        {
            return Vec::new();
        }

        let scores = score_map(image, template, method);
        let mut matches = Vec::new();

        for (x, y, pixel) in scores.enumerate_pixels() {
            let raw = pixel[0];
            if !raw.is_finite() {
                continue;
            }
            // score <= 1 - threshold for difference methods is the same test as this
            let confidence = if method.is_difference() { 1.0 - raw } else { raw };
            if confidence >= threshold {
                matches.push(Match {
                    template_name: String::new(),
                    x,
                    y,
                    width: template.width(),
                    height: template.height(),
                    confidence: confidence.clamp(0.0, 1.0),
                    scale,
                    method,
                });
            }
        }

        matches
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

/// Raw score for every window position; `(W - w + 1) x (H - h + 1)`
fn score_map(image: &GrayImage, template: &GrayImage, method: MatchMethod) -> ScoreMap {
    match method {
        MatchMethod::CrossCorrelationNormalized => match_template(
            image,
            template,
            MatchTemplateMethod::CrossCorrelationNormalized,
        ),
        MatchMethod::SquaredDifferenceNormalized => match_template(
            image,
            template,
            MatchTemplateMethod::SumOfSquaredErrorsNormalized,
        ),
        MatchMethod::CorrelationCoefficientNormalized => correlation_coefficient(image, template),
    }
}

/// Zero-mean normalized cross correlation
///
/// Built from the raw cross correlation plus windowed sums from integral images:
/// `(Σ I·T − Σ I · mean(T)) / sqrt(var_sum(I) · var_sum(T))`.
/// Flat windows (or a flat template) score 0.
fn correlation_coefficient(image: &GrayImage, template: &GrayImage) -> ScoreMap {
    let cross = match_template(image, template, MatchTemplateMethod::CrossCorrelation);
    let sums: SumTable = integral_image::<_, u64>(image);
    let squares: SumTable = integral_squared_image::<_, u64>(image);

    let (tw, th) = template.dimensions();
    let n = (tw * th) as f64;
    let (t_sum, t_sq) = template.pixels().fold((0.0f64, 0.0f64), |(s, q), p| {
        let v = p[0] as f64;
        (s + v, q + v * v)
    });
    let t_var = t_sq - t_sum * t_sum / n;

    ImageBuffer::from_fn(cross.width(), cross.height(), |x, y| {
        let s = window_sum(&sums, x, y, tw, th) as f64;
        let q = window_sum(&squares, x, y, tw, th) as f64;
        let i_var = q - s * s / n;
        let denominator = (i_var * t_var).sqrt();
        if denominator.is_nan() || denominator <= 1e-6 {
            return Luma([0.0]);
        }
        let numerator = cross.get_pixel(x, y)[0] as f64 - s * t_sum / n;
        Luma([(numerator / denominator).clamp(-1.0, 1.0) as f32])
    })
}

/// Sum over `[x, x + w) x [y, y + h)` from a zero-padded integral image
fn window_sum(table: &SumTable, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let bottom_right = table.get_pixel(x + w, y + h)[0];
    let top_left = table.get_pixel(x, y)[0];
    let top_right = table.get_pixel(x + w, y)[0];
    let bottom_left = table.get_pixel(x, y + h)[0];
    (bottom_right + top_left) - top_right - bottom_left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_matching::types::Template;
    use crate::test_images::{noise_template, paste};

    #[test]
    fn test_finds_template_at_known_position() {
        let template = noise_template(20, 20, 7);
        let mut image = GrayImage::from_pixel(120, 120, Luma([30]));
        paste(&mut image, &template, 50, 60);

        let matcher = TemplateMatcher::default();
        let matches = matcher.match_template(
            &image,
            &template,
            0.8,
            MatchMethod::CorrelationCoefficientNormalized,
        );

        assert_eq!(matches.len(), 1, "Expected exactly one match, got {:?}", matches);
        let m = &matches[0];
        assert!(m.x.abs_diff(50) <= 1 && m.y.abs_diff(60) <= 1, "Got ({}, {})", m.x, m.y);
        assert!(m.confidence >= 0.8, "Confidence {}", m.confidence);
        assert_eq!((m.width, m.height), (20, 20));
    }

    #[test]
    fn test_squared_difference_reports_high_confidence() {
        let template = noise_template(16, 16, 3);
        let mut image = GrayImage::from_pixel(80, 64, Luma([128]));
        paste(&mut image, &template, 30, 20);

        let matcher = TemplateMatcher::default();
        let matches = matcher.match_template(
            &image,
            &template,
            0.95,
            MatchMethod::SquaredDifferenceNormalized,
        );

        assert!(!matches.is_empty(), "Exact copy must match");
        assert_eq!((matches[0].x, matches[0].y), (30, 20));
        assert!(matches[0].confidence > 0.99, "Higher is better for every method");
    }

    #[test]
    fn test_template_larger_than_image() {
        let matcher = TemplateMatcher::default();
        let image = GrayImage::new(10, 10);
        let template = noise_template(20, 20, 1);
        assert!(
            matcher
                .match_template(&image, &template, 0.5, MatchMethod::default())
                .is_empty()
        );
    }

    #[test]
    fn test_flat_region_never_matches() {
        let matcher = TemplateMatcher::default();
        let image = GrayImage::from_pixel(40, 40, Luma([128]));
        let template = noise_template(12, 12, 9);
        let matches = matcher.match_template(&image, &template, 0.5, MatchMethod::default());
        assert!(matches.is_empty(), "Zero-variance windows score 0");
    }

    #[test]
    fn test_multiscale_finds_native_size() {
        let template = noise_template(24, 24, 11);
        let mut image = GrayImage::from_pixel(100, 90, Luma([20]));
        paste(&mut image, &template, 40, 30);

        let matcher = TemplateMatcher::default();
        let matches = matcher.match_multiscale(&image, &template, "haemon", 0.8);

        assert_eq!(matches.len(), 1, "Scales collapse into one match: {:?}", matches);
        assert_eq!(matches[0].template_name, "haemon");
        assert!(matches[0].x.abs_diff(40) <= 2 && matches[0].y.abs_diff(30) <= 2);
        assert!((matches[0].scale - 1.0).abs() < 1e-4, "Native scale wins");
    }

    #[test]
    fn test_multiscale_finds_enlarged_card() {
        let template = noise_template(40, 40, 13);
        let enlarged = imageops::resize(&template, 44, 44, FilterType::Triangle);
        let mut image = GrayImage::from_pixel(160, 160, Luma([30]));
        paste(&mut image, &enlarged, 50, 60);

        let matcher = TemplateMatcher::default();
        let matches = matcher.match_multiscale(&image, &template, "stror", 0.8);

        let best = matches.first().expect("Enlarged card must match");
        assert!(best.x.abs_diff(50) <= 1 && best.y.abs_diff(60) <= 1, "Got ({}, {})", best.x, best.y);
        assert!((best.scale - 1.1).abs() < 1e-3, "Expected 1.1x, got {:.3}x", best.scale);
        assert_eq!((best.width, best.height), (44, 44), "Footprint is the scaled size");
    }

    #[test]
    fn test_multiscale_skips_tiny_templates() {
        // 10px template at 0.9x rounds to 9px: skipped; native size still searched
        let template = noise_template(10, 10, 5);
        let mut image = GrayImage::from_pixel(50, 50, Luma([0]));
        paste(&mut image, &template, 5, 5);

        let matcher = TemplateMatcher::default();
        let matches = matcher.match_multiscale(&image, &template, "tiny", 0.9);
        assert!(matches.iter().all(|m| m.width >= 10 && m.height >= 10));
        assert!(!matches.is_empty());
    }

    #[test]
    fn test_find_all_empty_inputs() {
        let matcher = TemplateMatcher::default();
        let library = TemplateLibrary::new();
        assert!(matcher.find_all(&GrayImage::new(50, 50), &library, true).is_empty());

        let library: TemplateLibrary =
            vec![Template::new("a", noise_template(12, 12, 2))].into_iter().collect();
        assert!(matcher.find_all(&GrayImage::new(0, 0), &library, true).is_empty());
    }

    #[test]
    fn test_find_all_keys_by_template_name() {
        let hero = noise_template(20, 20, 21);
        let other = noise_template(20, 20, 42);
        let mut image = GrayImage::from_pixel(120, 60, Luma([10]));
        paste(&mut image, &hero, 10, 10);

        let library: TemplateLibrary = vec![
            Template::new("haemon", hero),
            Template::new("stror", other),
        ]
        .into_iter()
        .collect();

        let matcher = TemplateMatcher::default();
        let results = matcher.find_all(&image, &library, false);
        assert_eq!(results.keys().cloned().collect::<Vec<_>>(), vec!["haemon".to_string()]);
        assert_eq!(results["haemon"][0].template_name, "haemon");
    }

    #[test]
    fn test_alpha_dropped_before_grayscale() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 0]));
        let rgb = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 100, 50]));
        let from_rgba = to_grayscale(&DynamicImage::ImageRgba8(rgba));
        let from_rgb = to_grayscale(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(from_rgba, from_rgb, "Transparent pixels keep their color");
    }
}
