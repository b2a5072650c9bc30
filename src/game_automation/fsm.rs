// Finite state machine driving one battle report scan
use super::cancel::CancelToken;
use super::content_hash::ContentTracker;
use super::match_image::{CardDetector, CardSighting, SearchRegion};
use super::report::{Participant, ScanReport};
use super::scroll::{FrameOutcome, ScrollPolicy, ScrollStep};
use super::tracker::{InstanceTracker, normalize};
use super::types::{CardKind, EndReason, ScanState};
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::screen::{OcrEngine, ScreenBackend, ScreenResult, join_fragments};
use crate::template_matching::{TemplateLibrary, load_library, load_prefixed};
use image::{GrayImage, RgbImage, imageops};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

/// Template libraries a scan needs
pub struct ScanAssets {
    pub heroes: TemplateLibrary,
    pub captains: TemplateLibrary,
    pub start_marker: TemplateLibrary,
    pub end_markers: TemplateLibrary,
    /// Optional; an empty library disables the armor check
    pub armor: TemplateLibrary,
}

impl ScanAssets {
    /// Load every template category; any missing category stops the scan before it starts
    pub fn load(config: &ScanConfig) -> ScanResult<Self> {
        let assets = &config.assets;
        let heroes = load_library(&assets.heroes_dir, &config.matcher)?;
        let captains = load_library(&assets.captains_dir, &config.matcher)?;

        let start_marker = load_prefixed(&assets.markers_dir, &assets.start_marker)?;
        if start_marker.is_empty() {
            return Err(ScanError::MarkerAssetsMissing {
                prefix: assets.start_marker.clone(),
                path: assets.markers_dir.clone(),
            });
        }

        let end_markers = load_prefixed(&assets.markers_dir, &assets.end_marker_prefix)?;
        if end_markers.is_empty() {
            return Err(ScanError::MarkerAssetsMissing {
                prefix: assets.end_marker_prefix.clone(),
                path: assets.markers_dir.clone(),
            });
        }

        let armor = load_prefixed(&assets.markers_dir, &assets.armor_prefix)?;
        if armor.is_empty() {
            log::info!("🛡️ No '{}*' templates, armor check disabled", assets.armor_prefix);
        }

        log::info!(
            "✅ Assets ready: {} heroes, {} captains, {} end markers",
            heroes.len(),
            captains.len(),
            end_markers.len()
        );

        Ok(Self {
            heroes,
            captains,
            start_marker,
            end_markers,
            armor,
        })
    }
}

pub struct ScanDriver<B: ScreenBackend, O: OcrEngine> {
    backend: B,
    ocr: O,
    config: ScanConfig,
    detector: CardDetector,
    start_marker: TemplateLibrary,
    end_markers: TemplateLibrary,
    armor: TemplateLibrary,
    tracker: InstanceTracker,
    policy: ScrollPolicy,
    content: ContentTracker,
    cancel: CancelToken,
    state: ScanState,
    participants: Vec<Participant>,
    participant_index: BTreeMap<String, usize>,
    processed_captains: BTreeSet<String>,
    captain_positions: BTreeSet<(i32, i32)>,
    frames: u32,
}

impl<B: ScreenBackend, O: OcrEngine> ScanDriver<B, O> {
    pub fn new(backend: B, ocr: O, config: ScanConfig, assets: ScanAssets, cancel: CancelToken) -> Self {
        let detector = CardDetector::new(
            config.matcher.clone(),
            config.detector.clone(),
            assets.heroes,
            assets.captains,
        );
        Self {
            backend,
            ocr,
            detector,
            start_marker: assets.start_marker,
            end_markers: assets.end_markers,
            armor: assets.armor,
            tracker: InstanceTracker::new(config.tracker.clone()),
            policy: ScrollPolicy::new(config.scroll.clone()),
            content: ContentTracker::new(config.scroll.hash_precision),
            cancel,
            state: ScanState::Idle,
            participants: Vec::new(),
            participant_index: BTreeMap::new(),
            processed_captains: BTreeSet::new(),
            captain_positions: BTreeSet::new(),
            frames: 0,
            config,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn tracker(&self) -> &InstanceTracker {
        &self.tracker
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a full session: wait, find the start marker, scan until a stop condition
    pub fn run(&mut self) -> ScanReport {
        let started = Instant::now();
        self.reset_session();
        log::info!("🎮 Starting scan on {}", self.backend.name());

        let reason = match self.wait_start_delay() {
            ControlFlow::Break(reason) => reason,
            ControlFlow::Continue(()) => {
                self.change_state(ScanState::SearchingForStart);
                match self.search_start_marker() {
                    ControlFlow::Break(reason) => reason,
                    ControlFlow::Continue(()) => {
                        self.change_state(ScanState::Scanning);
                        self.scan_loop()
                    }
                }
            }
        };

        self.finish(reason, started.elapsed())
    }

    fn reset_session(&mut self) {
        if self.state.is_terminal() {
            log::info!("🔄 Restarting after {:?}", self.state);
        }
        self.tracker.reset();
        self.policy.reset();
        self.content.reset();
        self.participants.clear();
        self.participant_index.clear();
        self.processed_captains.clear();
        self.captain_positions.clear();
        self.frames = 0;
        self.state = ScanState::Idle;
    }

    fn change_state(&mut self, new_state: ScanState) {
        if self.state != new_state {
            log::info!("🎮 Scan state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
        }
    }

    fn wait_start_delay(&mut self) -> ControlFlow<EndReason> {
        let secs = self.config.timing.start_delay_secs;
        for remaining in (1..=secs).rev() {
            log::info!("⏳ Starting in {}s...", remaining);
            if !self.cancel.sleep(Duration::from_secs(1)) {
                break;
            }
        }
        self.check_cancelled()
    }

    fn check_cancelled(&self) -> ControlFlow<EndReason> {
        if self.cancel.is_cancelled() {
            log::warn!("⏹️ Scan cancelled");
            ControlFlow::Break(EndReason::Cancelled)
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Scroll down until the report's start marker is on screen
    fn search_start_marker(&mut self) -> ControlFlow<EndReason> {
        let (fx, fy) = self.config.layout.log_focus();
        if let Err(e) = self.backend.click(fx, fy) {
            log::warn!("⚠️ Focus click failed: {}", e);
        }
        self.cancel.sleep(self.config.timing.focus());

        let attempts = self.config.scroll.start_marker_attempts;
        let threshold = self.config.assets.start_marker_threshold;
        for attempt in 1..=attempts {
            self.check_cancelled()?;

            let screen = match self.backend.capture_screen() {
                Ok(screen) => grayscale(&screen),
                Err(e) => {
                    log::warn!("⚠️ Capture failed on start search {}/{}: {}", attempt, attempts, e);
                    continue;
                }
            };

            if let Some(marker) = self.detector.find_marker(&screen, &self.start_marker, threshold) {
                log::info!("✅ Start marker found: {}", marker.describe());
                let found_step = self.config.scroll.start_found_step;
                let align_step = self.config.scroll.align_step;
                self.scroll_with_focus(found_step)?;
                self.scroll_with_focus(align_step)?;
                return ControlFlow::Continue(());
            }

            log::debug!("🔍 Start marker search {}/{}", attempt, attempts);
            let step = self.config.scroll.start_search_step;
            self.scroll_with_focus(step)?;
        }

        log::error!("❌ Start marker not found after {} attempts", attempts);
        ControlFlow::Break(EndReason::StartMarkerNotFound)
    }

    fn scroll_with_focus(&mut self, step: ScrollStep) -> ControlFlow<EndReason> {
        let (fx, fy) = self.config.layout.log_focus();
        if let Err(e) = self.backend.move_pointer(fx, fy) {
            log::warn!("⚠️ Pointer move failed: {}", e);
        }
        self.scroll(step)
    }

    fn scroll(&mut self, step: ScrollStep) -> ControlFlow<EndReason> {
        if let Err(e) = self.backend.scroll(step.amount) {
            log::warn!("⚠️ Scroll {} failed: {}", step.amount, e);
        }
        if !self.cancel.sleep(step.settle()) {
            return self.check_cancelled();
        }
        ControlFlow::Continue(())
    }

    fn scan_loop(&mut self) -> EndReason {
        loop {
            if let ControlFlow::Break(reason) = self.check_cancelled() {
                return reason;
            }

            self.frames += 1;
            let outcome = match self.scan_frame() {
                ControlFlow::Break(reason) => return reason,
                ControlFlow::Continue(outcome) => outcome,
            };

            let (decision, step) = self.policy.next_step(&outcome);
            log::info!(
                "📜 Frame {}: {}/{} cards processed, {} -> scroll {}",
                self.frames,
                outcome.cards_processed,
                outcome.cards_found,
                decision.describe(),
                step.amount
            );
            if let ControlFlow::Break(reason) = self.scroll(step) {
                return reason;
            }

            if self.policy.no_progress_exceeded() {
                log::warn!(
                    "⚠️ No progress for {} frames, assuming end of report",
                    self.policy.no_progress_count()
                );
                return EndReason::NoProgress;
            }
            if self.frames >= self.config.scroll.max_frames {
                log::warn!("⚠️ Frame limit of {} reached", self.config.scroll.max_frames);
                return EndReason::FrameLimit;
            }
        }
    }

    /// Capture, check for the end marker and process every card of one frame
    fn scan_frame(&mut self) -> ControlFlow<EndReason, FrameOutcome> {
        let screen = match self.backend.capture_screen() {
            Ok(screen) => screen,
            Err(e) => {
                if e.is_transient() {
                    log::warn!("⚠️ Capture failed on frame {}: {}", self.frames, e);
                } else {
                    log::error!("❌ Capture failed on frame {}: {}", self.frames, e);
                }
                return ControlFlow::Continue(FrameOutcome::default());
            }
        };
        let gray = grayscale(&screen);
        let origin = SearchRegion::full_screen(screen.width(), screen.height());

        let threshold = self.config.assets.end_marker_threshold;
        if let Some(marker) = self.detector.find_marker(&gray, &self.end_markers, threshold) {
            log::info!("🐉 End marker found: {}", marker.describe());
            self.process_frame(&gray, &origin);
            return ControlFlow::Break(EndReason::EndMarker);
        }

        let (cards_found, cards_processed) = self.process_frame(&gray, &origin);

        let content_unchanged = match self.config.layout.log_region.crop_rgb(&screen, &origin) {
            Some(log_area) => self.content.observe(&log_area),
            None => false,
        };

        ControlFlow::Continue(FrameOutcome {
            cards_found,
            cards_processed,
            content_unchanged,
            needs_scroll: self.tracker.needs_scroll(),
        })
    }

    /// Returns (cards found, cards newly processed)
    fn process_frame(&mut self, gray: &GrayImage, origin: &SearchRegion) -> (usize, usize) {
        let region = self.config.layout.log_region.clone();
        let detection = self.detector.detect_all(gray, origin, &region);

        let mut processed = 0;
        for sighting in &detection.sightings {
            if self.cancel.is_cancelled() {
                break;
            }
            let result = match sighting.kind {
                CardKind::Hero => self.process_hero(sighting),
                CardKind::Captain => self.process_captain(sighting),
            };
            match result {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) if e.is_transient() => {
                    log::warn!("⚠️ Failed processing {} {}: {}", sighting.kind, sighting.name, e)
                }
                Err(e) => log::error!("❌ Failed processing {} {}: {}", sighting.kind, sighting.name, e),
            }
        }
        (detection.sightings.len(), processed)
    }

    fn process_hero(&mut self, sighting: &CardSighting) -> ScreenResult<bool> {
        let y_center = sighting.y + self.detector.config().center_offset_y;
        self.tracker.add_detection(&sighting.name, y_center);

        if let Some(reason) = self.tracker.skip_reason_at(&sighting.name, y_center, Instant::now()) {
            log::info!("⏭️ SKIP: {} @ Y={} ({})", sighting.name, y_center, reason);
            return Ok(false);
        }

        log::info!("📍 Hero {} at ({}, {})", sighting.name, sighting.x, sighting.y);
        let (cx, cy) = sighting.offset(self.detector.config().hero_click_offset);
        self.backend.click(cx, cy)?;
        self.cancel.sleep(self.config.timing.hero_panel());

        let label_region = self.config.layout.label_region.clone();
        let label = self.read_text(&label_region);
        self.tracker.mark_processed(&sighting.name, y_center, label.as_deref());

        match &label {
            Some(label) => {
                log::info!("✅ Label captured: {}", label);
                self.record_participant(label, &sighting.name, (sighting.x, sighting.y));
            }
            None => log::warn!("⚠️ Could not read label for {} @ Y={}", sighting.name, y_center),
        }

        // The card is already marked; a stuck panel must not undo that
        let close = self.config.layout.close_hero;
        if let Err(e) = self.close_panel(close) {
            log::warn!("⚠️ Closing hero panel of {} failed: {}", sighting.name, e);
        }
        Ok(true)
    }

    fn process_captain(&mut self, sighting: &CardSighting) -> ScreenResult<bool> {
        let name_key = normalize(&sighting.name);
        if self.processed_captains.contains(&name_key) {
            log::debug!("⏭️ Captain {} already processed", sighting.name);
            return Ok(false);
        }

        let grid = self.config.captains.position_grid.max(1);
        let position_key = (snap(sighting.x, grid), snap(sighting.y, grid));
        if !self.captain_positions.insert(position_key) {
            log::debug!("⏭️ Captain slot ({}, {}) already handled", sighting.x, sighting.y);
            return Ok(false);
        }

        let forbidden = !self.config.captains.is_allowed(&sighting.name);
        if forbidden || self.config.captains.inspect_all {
            log::info!(
                "📍 Captain {} at ({}, {}){}",
                sighting.name,
                sighting.x,
                sighting.y,
                if forbidden { " 🚫 forbidden" } else { "" }
            );
            let (cx, cy) = sighting.offset(self.detector.config().captain_click_offset);
            self.backend.click(cx, cy)?;
            self.cancel.sleep(self.config.timing.captain_panel());

            let name_region = self.config.layout.captain_name_region.clone();
            let read_name = self.read_text(&name_region);
            log::debug!("🔍 Captain panel reads {:?}", read_name);
            let has_armor = self.check_armor();

            if forbidden {
                match self.find_associated_hero((sighting.x, sighting.y)) {
                    Some(index) => {
                        let participant = &mut self.participants[index];
                        participant.add_forbidden_captain(&sighting.name);
                        if has_armor {
                            participant.add_captain_with_armor(&sighting.name);
                        }
                        log::info!("🚫 {} brought captain {}", participant.label, sighting.name);
                    }
                    None => log::warn!("⚠️ No hero found next to captain {}", sighting.name),
                }
            }

            self.processed_captains.insert(name_key);
            let close = self.config.layout.close_captain;
            if let Err(e) = self.close_panel(close) {
                log::warn!("⚠️ Closing captain panel of {} failed: {}", sighting.name, e);
            }
        }

        Ok(true)
    }

    /// OCR a screen region; `None` when nothing readable came back
    fn read_text(&mut self, region: &SearchRegion) -> Option<String> {
        let image = match self.backend.capture(region) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("⚠️ Capture of {} failed: {}", region, e);
                return None;
            }
        };
        match self.ocr.extract_text(&image) {
            Ok(fragments) => {
                for f in &fragments {
                    log::debug!("   • '{}' ({:.2})", f.text, f.confidence);
                }
                join_fragments(&fragments, self.config.ocr.min_label_confidence)
            }
            Err(e) => {
                log::warn!("⚠️ OCR failed on {}: {}", region, e);
                None
            }
        }
    }

    fn check_armor(&mut self) -> bool {
        if self.armor.is_empty() {
            return false;
        }
        let region = self.config.layout.captain_panel_region.clone();
        match self.backend.capture(&region) {
            Ok(panel) => self
                .detector
                .find_marker(&grayscale(&panel), &self.armor, self.config.assets.armor_threshold)
                .is_some(),
            Err(e) => {
                log::warn!("⚠️ Armor check capture failed: {}", e);
                false
            }
        }
    }

    /// Close the opened panel and hand wheel focus back to the log
    fn close_panel(&mut self, (x, y): (i32, i32)) -> ScreenResult<()> {
        self.backend.click(x, y)?;
        self.cancel.sleep(self.config.timing.close());
        let (fx, fy) = self.config.layout.log_focus();
        self.backend.move_pointer(fx, fy)?;
        self.cancel.sleep(self.config.timing.close());
        Ok(())
    }

    fn record_participant(&mut self, label: &str, hero_name: &str, position: (i32, i32)) {
        let key = normalize(label);
        if self.participant_index.contains_key(&key) {
            return;
        }
        self.participant_index.insert(key, self.participants.len());
        self.participants
            .push(Participant::new(label, normalize(hero_name), position));
    }

    /// Nearest confirmed hero to the left of a captain, in the same row
    fn find_associated_hero(&self, (x, y): (i32, i32)) -> Option<usize> {
        let card_width = self.detector.config().card_width as i32;
        let card_height = self.detector.config().card_height as i32;

        self.participants
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let (hx, hy) = p.position;
                hx < x && (hy - y).abs() < card_height && x - hx < card_width * 3
            })
            .min_by_key(|(_, p)| x - p.position.0)
            .map(|(index, _)| index)
    }

    fn finish(&mut self, reason: EndReason, elapsed: Duration) -> ScanReport {
        self.change_state(ScanState::Finished(reason));
        let report = ScanReport {
            participants: self.participants.clone(),
            tracker: self.tracker.stats(),
            frames_scanned: self.frames,
            end_reason: reason,
            elapsed,
            cancelled: self.cancel.is_cancelled(),
        };
        report.log_summary();
        report
    }
}

fn grayscale(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

fn snap(value: i32, grid: i32) -> i32 {
    ((value as f32 / grid as f32).round() as i32) * grid
}
