use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Run a full scan over recorded screenshots
    Replay(PathBuf),
    /// Detect cards in a single screenshot and exit
    Detect(PathBuf),
    /// Print the effective configuration as JSON
    PrintConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub config_path: Option<PathBuf>,
    pub debug_mode: bool,
    pub single_scale: bool,
    pub inspect_all: bool,
    pub start_delay_secs: Option<u64>,
}

#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Args),
    Help,
    Version,
}

impl Args {
    /// Parse the process arguments; prints help or the error and returns `None` when
    /// there is nothing to run
    pub fn parse() -> Option<Self> {
        match Self::parse_from(env::args().skip(1)) {
            Ok(Parsed::Run(args)) => Some(args),
            Ok(Parsed::Help) => {
                print_help();
                None
            }
            Ok(Parsed::Version) => {
                println!("Battle Report Scan v{}", env!("CARGO_PKG_VERSION"));
                None
            }
            Err(message) => {
                eprintln!("❌ {}", message);
                print_help();
                None
            }
        }
    }

    /// Parse flags, program name excluded
    pub fn parse_from<I, S>(args: I) -> Result<Parsed, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mode: Option<Mode> = None;
        let mut config_path = None;
        let mut debug_mode = false;
        let mut single_scale = false;
        let mut inspect_all = false;
        let mut start_delay_secs = None;

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                return Ok(Parsed::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Parsed::Version);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--single-scale" {
                single_scale = true;
            } else if arg == "--inspect-all" {
                inspect_all = true;
            } else if arg == "--print-config" {
                mode = Some(Mode::PrintConfig);
            } else if let Some(dir) = arg.strip_prefix("--replay=") {
                mode = Some(Mode::Replay(non_empty_path("--replay", dir)?));
            } else if let Some(image) = arg.strip_prefix("--detect=") {
                mode = Some(Mode::Detect(non_empty_path("--detect", image)?));
            } else if let Some(path) = arg.strip_prefix("--config=") {
                config_path = Some(non_empty_path("--config", path)?);
            } else if let Some(val) = arg.strip_prefix("--start-delay=") {
                match val.parse::<u64>() {
                    Ok(secs) => start_delay_secs = Some(secs),
                    Err(_) => return Err(format!("Invalid start delay: {}", val)),
                }
            } else {
                return Err(format!("Unknown argument: {}", arg));
            }
        }

        let mode = mode.ok_or_else(|| "No mode given".to_string())?;
        Ok(Parsed::Run(Args {
            mode,
            config_path,
            debug_mode,
            single_scale,
            inspect_all,
            start_delay_secs,
        }))
    }
}

fn non_empty_path(flag: &str, value: &str) -> Result<PathBuf, String> {
    if value.is_empty() {
        Err(format!("{} needs a path", flag))
    } else {
        Ok(PathBuf::from(value))
    }
}

fn print_help() {
    println!("🐉 Battle Report Scan");
    println!();
    println!("USAGE:");
    println!("    battle-report-scan <MODE> [FLAGS]");
    println!();
    println!("MODES:");
    println!("    --replay=DIR        Scan recorded screenshots in DIR (labels from DIR/labels.txt)");
    println!("    --detect=IMAGE      Detect hero and captain cards in one screenshot");
    println!("    --print-config      Print the effective configuration as JSON");
    println!();
    println!("FLAGS:");
    println!("    --config=PATH       Load a JSON config (missing fields keep defaults)");
    println!("    --start-delay=N     Count down N seconds before scanning");
    println!("    --single-scale      Match templates at native size only");
    println!("    --inspect-all       Open allowed captains' panels too");
    println!("    --debug             Enable debug output");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    battle-report-scan --replay=recordings/war-12 --start-delay=5");
    println!("    battle-report-scan --detect=screenshot.png --single-scale --debug");
    println!("    RUST_LOG=battle_report_scan=debug battle-report-scan --replay=recordings/war-12");
}
