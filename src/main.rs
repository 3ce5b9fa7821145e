// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use qrscan::backends::camera::CameraFacing;
use std::path::PathBuf;
use std::time::Duration;

mod cli;

#[derive(Parser)]
#[command(name = "qrscan")]
#[command(about = "Scan and generate QR codes")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a QR code from an image file
    Scan {
        /// Image to scan
        image: PathBuf,
    },

    /// Run a live scan session on file-backed cameras
    Live {
        /// Image streamed by the back camera
        #[arg(long)]
        back: PathBuf,

        /// Image streamed by the front camera
        #[arg(long)]
        front: Option<PathBuf>,

        /// Camera to start with (default from config)
        #[arg(long, value_enum)]
        facing: Option<FacingArg>,

        /// Turn the torch on while scanning
        #[arg(long)]
        torch: bool,

        /// Flip to the other camera after this many milliseconds
        #[arg(long)]
        switch_after_ms: Option<u64>,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,
    },

    /// Generate a QR code image
    Generate {
        /// Text to encode
        text: String,

        /// Output file or directory (default: the share cache)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target image size in pixels
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FacingArg {
    Front,
    Back,
}

impl From<FacingArg> for CameraFacing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Front => CameraFacing::Front,
            FacingArg::Back => CameraFacing::Back,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qrscan=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { image } => cli::scan_image(&image),
        Commands::Live {
            back,
            front,
            facing,
            torch,
            switch_after_ms,
            timeout_secs,
        } => cli::live_scan(cli::LiveOptions {
            back,
            front,
            facing: facing.map(CameraFacing::from),
            torch,
            switch_after: switch_after_ms.map(Duration::from_millis),
            timeout: Duration::from_secs(timeout_secs),
        }),
        Commands::Generate { text, output, size } => cli::generate(&text, output, size),
        Commands::Config { save } => cli::show_config(save),
    }
}
