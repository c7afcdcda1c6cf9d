//! Tessera - a small compositing window-server core
//!
//! Runs a scripted session on the headless backend and prints one JSON
//! report per painted frame.
//!
//! # Features
//! - Damage-tracked repaint with opaque occlusion
//! - Per-surface transform chains and spring animations
//! - Output zoom following the pointer
//! - Pointer, keyboard and touch focus with move, resize, rotate and popup grabs
//! - Configurable key, button and axis bindings
//! - Idle fade, sleep and wake

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tessera_core::config::Config;

mod session;

/// Tessera - headless compositor session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Run in debug mode with verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print default configuration to stdout
    #[arg(long)]
    print_default_config: bool,

    /// Number of frames to run the scripted session for
    #[arg(long, default_value_t = 60)]
    frames: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the level
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Tessera v{} starting...", env!("CARGO_PKG_VERSION"));

    if args.print_default_config {
        println!("{}", Config::default_config_string());
        return Ok(());
    }

    if args.validate {
        let config = Config::load(args.config.as_deref())?;
        config.validate().context("Configuration is invalid")?;
        info!("Configuration is valid");
        return Ok(());
    }

    let config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        },
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        },
    };
    config.validate()?;

    for report in session::run(config, args.frames)? {
        println!("{}", serde_json::to_string(&report)?);
    }

    info!("Tessera shutdown complete");
    Ok(())
}
