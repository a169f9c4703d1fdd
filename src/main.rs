//! mapgestr – touch gestures driving an inertial map camera.
//!
//! CLI entry point.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};

use mapgestr::config::{AppConfig, parse_config_file};
use mapgestr::event::parse_touch_script;
use mapgestr::manager::{MapSession, list_touch_devices, replay, run_live};

#[derive(Parser)]
#[command(name = "mapgestr", about = "Touch gestures for map views")]
struct Cli {
    /// Path to configuration file (built-in defaults when omitted)
    config: Option<PathBuf>,

    /// Replay a TOML touch script instead of reading a touchscreen
    #[arg(short, long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List available touchscreen devices and exit
    #[arg(short, long)]
    list_devices: bool,
}

/// Simple logger that writes to stderr and optionally to a log file.
struct MapGestrLogger {
    level: LevelFilter,
    file: Option<Mutex<std::fs::File>>,
}

impl Log for MapGestrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("mapgestr")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let line = format!("[{secs} {level} mapgestr] {}\n", record.args());

        eprint!("{line}");

        if let Some(ref file_mutex) = self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file_mutex) = self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.flush();
            }
        }
    }
}

fn init_logger(config: &AppConfig, verbose: bool) {
    // --verbose overrides the config file setting.
    let level: LevelFilter = if verbose {
        LevelFilter::Debug
    } else {
        config.log_level.parse().unwrap_or(LevelFilter::Info)
    };

    let file = config.log_file.as_deref().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Mutex::new(file)),
            Err(e) => {
                eprintln!("Warning: cannot open log file '{path}': {e}");
                None
            }
        }
    });

    let logger = MapGestrLogger { level, file };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}

fn run_replay(config: &AppConfig, path: &Path) -> ExitCode {
    let script = match parse_touch_script(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("Replaying {} touch events from {}", script.len(), path.display());

    let mut session = MapSession::new(config);
    for gesture in replay(&mut session, &script) {
        println!("{gesture:?}");
    }

    let view = session.view();
    println!(
        "center {:.6},{:.6} zoom {:.3} rotation {:.2} tilt {:.2}",
        view.center.latitude, view.center.longitude, view.zoom_factor, view.rotation_angle, view.tilt
    );
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_touch_devices();
    }

    // Parse config first (before logger init) so we can read the configured log level.
    let config = match cli.config.as_deref() {
        Some(path) => match parse_config_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    init_logger(&config, cli.verbose);

    if let Some(path) = cli.replay.as_deref() {
        return run_replay(&config, path);
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::Relaxed);
    }) {
        eprintln!("Error setting Ctrl-C handler: {e}");
        return ExitCode::FAILURE;
    }

    match run_live(&config, &running) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "Error: {e}\n\n\
                 To find available touchscreen devices, run:\n\
                 \x20 mapgestr --list-devices"
            );
            ExitCode::FAILURE
        }
    }
}
