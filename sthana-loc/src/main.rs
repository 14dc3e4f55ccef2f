//! SthanaLoc - LiDAR localization daemon
//!
//! Replays a recorded drive (prior map, LiDAR scans, GPS fixes) through the
//! localizer and writes the vehicle pose trace as CSV.
//!
//! # Usage
//!
//! ```bash
//! # With default config (sthana-loc.toml or /etc/sthana-loc.toml)
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config itri.toml
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sthana_loc::config::Config;
use sthana_loc::io::replay::ReplaySource;
use sthana_loc::io::transport::DEFAULT_CHANNEL_CAPACITY;
use sthana_loc::{
    LocalizationError, Localizer, LogPublisher, PointToPointIcp, ResultRecorder,
    VoxelGridDownsampler, create_event_channel,
};

struct Args {
    config_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("sthana-loc - LiDAR localization against a prior point cloud map");
    println!();
    println!("USAGE:");
    println!("    sthana-loc [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: sthana-loc.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    All settings are configured via the TOML config file:");
    println!("    - [source] map_file, scan_dir, fix_file: Recorded dataset");
    println!("    - [extrinsics] baselink2lidar_trans/rot: LiDAR mounting");
    println!("    - [output] result_save_path: CSV pose trace");
}

fn load_config(args: &Args) -> Result<Config, LocalizationError> {
    match &args.config_path {
        Some(path) => {
            let config = Config::load(path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => {
            let (config, path) = Config::load_default()?;
            match path {
                Some(path) => log::info!("Loaded config from {}", path.display()),
                None => log::info!("No config file found, using defaults"),
            }
            Ok(config)
        }
    }
}

fn run(args: &Args) -> Result<(), LocalizationError> {
    let config = load_config(args)?;
    let localizer_config = config.to_localizer_config()?;
    let extrinsics = config.extrinsics()?;
    let replay_config = config.replay_config();

    log::info!("sthana-loc starting");
    log::info!("  Map: {}", replay_config.map_file.display());
    log::info!("  Scans: {}", replay_config.scan_dir.display());
    log::info!(
        "  Leaf sizes: scan {:.2} m, map {:.2} m",
        localizer_config.tracker.scan_leaf_size,
        localizer_config.tracker.map_leaf_size
    );
    log::info!(
        "  Heading search: {} candidates",
        localizer_config.heading_search.candidates().len()
    );

    let recorder = ResultRecorder::create(config.result_path())?;
    let source = ReplaySource::open(&replay_config)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let (tx, rx) = create_event_channel(DEFAULT_CHANNEL_CAPACITY);
    let replay = source
        .spawn(tx, running.clone())
        .expect("Failed to spawn replay thread");

    let localizer = Localizer::new(
        localizer_config,
        Arc::new(PointToPointIcp::new()),
        Arc::new(VoxelGridDownsampler::new()),
        extrinsics,
        recorder,
        Box::new(LogPublisher::new()),
    );

    let outcome = localizer.run(&rx, &running);

    // Unblock the replay thread if it is waiting on a full channel
    running.store(false, Ordering::SeqCst);
    drop(rx);
    if replay.join().is_err() {
        log::error!("Replay thread panicked");
    }

    let summary = outcome?;
    if let Some(initial) = &summary.initial_pose {
        log::info!(
            "Initial heading {:.3} rad (fitness {:.6}, {} candidates)",
            initial.heading,
            initial.fitness,
            initial.candidates_evaluated
        );
    }
    log::info!(
        "Trace: {} ({} rows)",
        summary.trace.path.display(),
        summary.trace.rows
    );

    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();

    if let Err(e) = run(&args) {
        log::error!("sthana-loc failed: {}", e);
        std::process::exit(1);
    }

    log::info!("sthana-loc stopped");
}
