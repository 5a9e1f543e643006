//! CLI application for earshot

mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use render::{RenderOptions, SourceKind};
use settings_manager::ConfigManager;
use std::path::PathBuf;

/// earshot - interaural spatialization of a moving emitter
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Settings file (defaults to the user config directory)
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an emitter orbiting the listener
    Render {
        /// Length of the render in seconds
        #[clap(long, default_value_t = 5.0)]
        seconds: f32,

        /// What the emitter plays
        #[clap(long, value_enum, default_value_t = SourceKind::Tone)]
        source: SourceKind,

        /// Tone frequency in Hz
        #[clap(long, default_value_t = 440.0)]
        frequency: f32,

        /// Orbit radius in meters
        #[clap(long, default_value_t = 3.0)]
        radius: f32,

        /// Seconds per orbit
        #[clap(long, default_value_t = 4.0)]
        orbit_seconds: f32,

        /// Write raw interleaved little-endian f32 samples here
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective settings as TOML
    Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configure logging based on debug flag
    if args.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
        debug!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = match &args.config {
        Some(path) => ConfigManager::with_file(path),
        None => ConfigManager::new(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(anyhow::anyhow!("Failed to load config: {}", e));
        }
    };
    debug!("Using settings from {:?}", config.path());

    match args.command {
        Command::Render {
            seconds,
            source,
            frequency,
            radius,
            orbit_seconds,
            output,
        } => {
            let options = RenderOptions {
                seconds,
                source,
                frequency,
                radius,
                orbit_seconds,
                output,
            };
            let report = render::render(config.settings(), &options).await?;

            for (second, (left, right)) in report.rms.iter().enumerate() {
                println!("{:>3}s  L {:>8.4}  R {:>8.4}", second, left, right);
            }
            if let Some(path) = &options.output {
                info!("Wrote {} frames to {:?}", report.frames, path);
            }
        }
        Command::Settings => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
