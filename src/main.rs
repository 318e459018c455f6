//! Framecast demo daemon
//!
//! Serves a synthetic moving test pattern over the frame stream protocol:
//! loads TOML configuration, starts a [`StreamServer`] and pushes generated
//! depth/color/infrared frames at the configured rate until Ctrl-C.

use framecast::config::AppConfig;
use framecast::error::Result;
use framecast::source::TestPatternSource;
use framecast::StreamServer;
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `framecast <path>` (positional)
/// - `framecast --config <path>` (flag-based)
/// - `framecast -c <path>` (short flag)
///
/// Defaults to `framecast.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "framecast.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = if Path::new(&config_path).exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::defaults()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    log::info!("Framecast v{} starting...", env!("CARGO_PKG_VERSION"));
    if Path::new(&config_path).exists() {
        log::info!("Using config: {}", config_path);
    } else {
        log::info!("Config {} not found, using defaults", config_path);
    }

    let server = StreamServer::new(config.server.clone());
    server.start()?;

    // Graceful shutdown on Ctrl-C
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| framecast::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut source = TestPatternSource::new(config.source.clone());
    let frame_interval = Duration::from_micros(1_000_000 / config.source.frame_rate.max(1) as u64);

    log::info!(
        "Streaming {}x{} test pattern at {} fps on {}",
        config.source.width,
        config.source.height,
        config.source.frame_rate,
        server.local_addr().map(|a| a.to_string()).unwrap_or_default()
    );
    log::info!("Press Ctrl-C to stop");

    let mut next_frame = Instant::now();
    let mut last_stats = Instant::now();

    while running.load(Ordering::Relaxed) {
        let raw = source.next_frame();
        server.push_frame(&raw);

        // Print statistics every 10 seconds
        if last_stats.elapsed().as_secs() >= 10 {
            log::info!(
                "Streaming... {} client(s), {} frames pushed, {} evicted",
                server.connected_clients(),
                server.frames_pushed(),
                server.frames_dropped()
            );
            last_stats = Instant::now();
        }

        next_frame += frame_interval;
        let now = Instant::now();
        if next_frame > now {
            std::thread::sleep(next_frame - now);
        } else {
            // Fell behind; resynchronize rather than bursting
            next_frame = now;
        }
    }

    log::info!("Shutting down...");
    server.stop();
    log::info!("Framecast stopped");
    Ok(())
}
