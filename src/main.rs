use battle_report_scan::args::{Args, Mode};
use battle_report_scan::game_automation::match_image::create_single_scale_config;
use battle_report_scan::game_automation::{CardDetector, SearchRegion};
use battle_report_scan::screen::{ReplayBackend, ScriptedOcr};
use battle_report_scan::template_matching::{load_library, to_grayscale};
use battle_report_scan::{CancelToken, ScanAssets, ScanConfig, ScanDriver, ScanError, ScanResult};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    let default_level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> ScanResult<()> {
    let mut config = match &args.config_path {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if args.single_scale {
        config.detector = create_single_scale_config();
        config.matcher.multiscale.enabled = false;
    }
    if args.inspect_all {
        config.captains.inspect_all = true;
    }
    if let Some(secs) = args.start_delay_secs {
        config.timing.start_delay_secs = secs;
    }

    match &args.mode {
        Mode::PrintConfig => {
            println!("{}", config.to_json());
            Ok(())
        }
        Mode::Detect(image) => detect(image, &config),
        Mode::Replay(dir) => replay(dir, config),
    }
}

fn replay(dir: &Path, config: ScanConfig) -> ScanResult<()> {
    let start_delay = config.timing.start_delay_secs;
    let mut config = config.without_delays();
    config.timing.start_delay_secs = start_delay;

    let backend = ReplayBackend::open(dir)?;
    let ocr = ScriptedOcr::from_directory(dir)?;
    let assets = ScanAssets::load(&config)?;
    log::info!("🎞️ Replaying {} frames from {}", backend.frame_count(), dir.display());

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if ctrlc::set_handler(move || {
        log::warn!("⏹️ Stop requested, finishing current card");
        handler_token.cancel();
    })
    .is_err()
    {
        log::warn!("⚠️ Could not install Ctrl-C handler");
    }

    let mut driver = ScanDriver::new(backend, ocr, config, assets, cancel);
    let report = driver.run();
    if report.participants.iter().any(|p| p.has_violations()) {
        log::warn!("🚫 Forbidden captains reported");
    }
    Ok(())
}

fn detect(image_path: &Path, config: &ScanConfig) -> ScanResult<()> {
    let image = image::open(image_path).map_err(|e| ScanError::ImageUnreadable {
        path: image_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let gray = to_grayscale(&image);

    let heroes = load_library(&config.assets.heroes_dir, &config.matcher)?;
    let captains = load_library(&config.assets.captains_dir, &config.matcher)?;
    let detector = CardDetector::new(config.matcher.clone(), config.detector.clone(), heroes, captains);

    let screen = SearchRegion::full_screen(gray.width(), gray.height());
    let region = if config.layout.log_region.is_within(&screen) {
        config.layout.log_region.clone()
    } else {
        log::info!(
            "📐 {} outside a {}x{} image, searching all of it",
            config.layout.log_region,
            gray.width(),
            gray.height()
        );
        screen.clone()
    };

    let result = detector.detect_all(&gray, &screen, &region);
    println!(
        "🔍 {} cards in {} ({}ms)",
        result.sightings.len(),
        image_path.display(),
        result.processing_time_ms
    );
    for sighting in &result.sightings {
        println!(
            "   {:<8} {:<20} at ({}, {}) {:.1}% @{:.2}x",
            sighting.kind.label(),
            sighting.name,
            sighting.x,
            sighting.y,
            sighting.confidence * 100.0,
            sighting.scale
        );
    }
    Ok(())
}
