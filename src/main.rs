// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_camera::{Config, MeasurementType};

mod cli;

#[derive(Parser)]
#[command(name = "survey-camera")]
#[command(about = "Camera capture for field-survey photos and videos")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory captures are written to
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Measurement type by survey code or prefix (e.g. INCENDIOS, RUI)
    #[arg(short, long, global = true)]
    measurement: Option<MeasurementType>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive terminal shell (default)
    Terminal,

    /// Probe the candidate table and report the first working camera
    Probe,

    /// Take a photo
    Photo {
        /// Frames to pump before capturing, lets exposure settle
        #[arg(short, long, default_value = "10")]
        warmup: u32,

        /// Name the photo as an extinguisher photo
        #[arg(short, long)]
        extinguisher: bool,
    },

    /// Record a video
    Video {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(short, long)]
        write: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=survey_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::path);
    let mut config = match &config_path {
        Some(path) => Config::load_from(path),
        None => Config::default(),
    };
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(measurement) = cli.measurement {
        config.measurement_type = measurement;
    }

    match cli.command {
        None | Some(Commands::Terminal) => survey_camera::terminal::run(&config),
        Some(Commands::Probe) => cli::probe(&config),
        Some(Commands::Photo {
            warmup,
            extinguisher,
        }) => cli::take_photo(&config, warmup, extinguisher),
        Some(Commands::Video { duration }) => cli::record_video(&config, duration),
        Some(Commands::Config { write }) => cli::show_config(&config, config_path, write),
    }
}
