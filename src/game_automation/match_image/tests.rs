//! Tests for card detection

use crate::game_automation::match_image::{
    CardDetector, CardSighting, DetectorConfig, SearchRegion, create_single_scale_config,
    suppress_nearby,
};
use crate::game_automation::types::CardKind;
use crate::template_matching::{Template, TemplateLibrary, create_card_config};
use crate::test_images::{noise_template, paste};
use image::{GrayImage, Luma};

const SCREEN_W: u32 = 240;
const SCREEN_H: u32 = 180;

fn log_region() -> SearchRegion {
    SearchRegion::new(40, 30, 160, 120, "log")
}

fn hero_template() -> GrayImage {
    noise_template(16, 16, 1)
}

fn captain_template() -> GrayImage {
    noise_template(16, 16, 2)
}

/// Screen with two heroes and one captain inside the log region
fn battle_screen() -> GrayImage {
    let mut screen = GrayImage::from_pixel(SCREEN_W, SCREEN_H, Luma([40]));
    paste(&mut screen, &hero_template(), 140, 110);
    paste(&mut screen, &hero_template(), 60, 50);
    paste(&mut screen, &captain_template(), 110, 50);
    screen
}

fn detector(config: DetectorConfig) -> CardDetector {
    let heroes: TemplateLibrary = vec![Template::new("haemon", hero_template())]
        .into_iter()
        .collect();
    let captains: TemplateLibrary = vec![Template::new("farhad", captain_template())]
        .into_iter()
        .collect();
    CardDetector::new(create_card_config(), config, heroes, captains)
}

fn sighting(name: &str, x: i32, y: i32, confidence: f32) -> CardSighting {
    CardSighting {
        name: name.to_string(),
        kind: CardKind::Hero,
        x,
        y,
        width: 50,
        height: 50,
        confidence,
        scale: 1.0,
    }
}

#[test]
fn test_region_crop_and_offset() {
    let screen = SearchRegion::full_screen(SCREEN_W, SCREEN_H);
    let region = log_region();

    assert!(region.is_within(&screen));
    assert_eq!(region.to_absolute(5, 7), (45, 37));
    assert_eq!(region.center(), (120, 90));
    assert!(region.contains_point(40, 30));
    assert!(!region.contains_point(200, 30), "Right edge is exclusive");

    let cropped = region.crop_gray(&battle_screen(), &screen).expect("crop");
    assert_eq!(cropped.dimensions(), (160, 120));
}

#[test]
fn test_region_clips_to_screen_bounds() {
    let region = SearchRegion::new(200, 150, 100, 100, "overflow");
    let clipped = region.clip_to_screen(SCREEN_W, SCREEN_H).expect("overlaps screen");
    assert_eq!((clipped.x, clipped.y), (200, 150));
    assert_eq!((clipped.width, clipped.height), (40, 30));

    let outside = SearchRegion::new(-50, 0, 40, 10, "left");
    assert_eq!(outside.clip_to_screen(SCREEN_W, SCREEN_H), None);
}

#[test]
fn test_region_from_corners() {
    let region = SearchRegion::from_corners(1190, 335, 1327, 355, "gametag");
    assert_eq!(region, SearchRegion::new(1190, 335, 137, 20, "gametag"));
}

#[test]
fn test_detector_config_defaults() {
    let config = DetectorConfig::default();
    assert_eq!(config.confidence_floor, 0.78);
    assert_eq!(config.duplicate_distance, 45.0);
    assert!(config.enable_multiscale);

    let strict = create_single_scale_config();
    assert!(!strict.enable_multiscale);
    assert!(strict.confidence_floor > config.confidence_floor);
}

#[test]
fn test_detect_translates_to_screen_coordinates() {
    let detector = detector(DetectorConfig::default());
    let screen = SearchRegion::full_screen(SCREEN_W, SCREEN_H);

    let result = detector.detect_all(&battle_screen(), &screen, &log_region());

    let found: Vec<(&str, CardKind, i32, i32)> = result
        .sightings
        .iter()
        .map(|s| (s.name.as_str(), s.kind, s.x, s.y))
        .collect();
    assert_eq!(
        found,
        vec![
            ("haemon", CardKind::Hero, 60, 50),
            ("farhad", CardKind::Captain, 110, 50),
            ("haemon", CardKind::Hero, 140, 110),
        ],
        "Sightings in reading order with absolute positions"
    );
    assert_eq!(result.of_kind(CardKind::Hero).count(), 2);
}

#[test]
fn test_detect_on_precropped_capture() {
    let detector = detector(create_single_scale_config());
    let screen = SearchRegion::full_screen(SCREEN_W, SCREEN_H);
    let region = log_region();
    let capture = region.crop_gray(&battle_screen(), &screen).expect("crop");

    let heroes = detector.detect(
        &capture,
        &region,
        &region,
        detector.library(CardKind::Hero),
        CardKind::Hero,
    );
    let positions: Vec<(i32, i32)> = heroes.iter().map(|s| (s.x, s.y)).collect();
    assert!(positions.contains(&(60, 50)), "Got {:?}", positions);
    assert!(positions.contains(&(140, 110)), "Got {:?}", positions);
}

#[test]
fn test_confidence_floor_filters() {
    let config = DetectorConfig {
        confidence_floor: 1.01,
        ..DetectorConfig::default()
    };
    let detector = detector(config);
    let screen = SearchRegion::full_screen(SCREEN_W, SCREEN_H);

    let result = detector.detect_all(&battle_screen(), &screen, &log_region());
    assert!(!result.has_sightings(), "Nothing passes a floor above 1.0");
}

#[test]
fn test_region_outside_capture() {
    let detector = detector(DetectorConfig::default());
    let screen = SearchRegion::full_screen(SCREEN_W, SCREEN_H);
    let elsewhere = SearchRegion::new(500, 500, 50, 50, "elsewhere");

    let result = detector.detect_all(&battle_screen(), &screen, &elsewhere);
    assert!(result.sightings.is_empty());
}

#[test]
fn test_suppress_nearby_same_name() {
    let kept = suppress_nearby(
        vec![
            sighting("haemon", 100, 100, 0.85),
            sighting("haemon", 120, 110, 0.92),
            sighting("stror", 105, 100, 0.80),
            sighting("haemon", 300, 100, 0.81),
        ],
        45.0,
    );

    let summary: Vec<(&str, i32, f32)> = kept
        .iter()
        .map(|s| (s.name.as_str(), s.x, s.confidence))
        .collect();
    assert_eq!(
        summary,
        vec![("stror", 105, 0.80), ("haemon", 300, 0.81), ("haemon", 120, 0.92)],
        "Different names never suppress each other"
    );
}

#[test]
fn test_suppress_nearby_reading_order() {
    let kept = suppress_nearby(
        vec![
            sighting("a", 300, 200, 0.9),
            sighting("b", 100, 200, 0.9),
            sighting("c", 500, 50, 0.9),
        ],
        45.0,
    );
    let order: Vec<&str> = kept.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(order, vec!["c", "b", "a"]);
}

#[test]
fn test_find_marker_in_family() {
    let marker = noise_template(20, 12, 77);
    let mut screen = GrayImage::from_pixel(SCREEN_W, SCREEN_H, Luma([90]));
    paste(&mut screen, &marker, 100, 150);

    let detector = detector(DetectorConfig::default());
    let family: TemplateLibrary = vec![
        Template::new("dragon", marker),
        Template::new("dragon_2", noise_template(20, 12, 78)),
    ]
    .into_iter()
    .collect();

    let found = detector.find_marker(&screen, &family, 0.8).expect("marker");
    assert_eq!(found.template_name, "dragon");
    assert_eq!((found.x, found.y), (100, 150));

    let empty = GrayImage::from_pixel(SCREEN_W, SCREEN_H, Luma([90]));
    assert!(detector.find_marker(&empty, &family, 0.8).is_none());
}
