//! ReelSync CLI: scriptable access to the timeline engine.
//!
//! Usage:
//!   reelsync analyze <TELEMETRY>   Suggest zoom blocks and typing speed-ups
//!   reelsync layout <PROJECT>      Print the frame layout of every track
//!   reelsync move <PROJECT> <CLIP> <START_MS>   Move a clip on its track
//!   reelsync slice <PROJECT>       Assemble per-chunk export telemetry
//!   reelsync validate <PROJECT>    Check a project for consistency
//!   reelsync config [--init]       Show or write the configuration
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reelsync_common::config::AppConfig;
use reelsync_common::logging::{cli_logging, init_logging};
use reelsync_timeline_core::SnapConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelsync",
    about = "Telemetry-driven timeline engine for screen recordings",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the motion and typing detectors on a telemetry file
    Analyze {
        /// Path to a JSONL telemetry file
        path: PathBuf,

        /// RNG seed for clustering (defaults to the configured seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Screen width when the file has no header
        #[arg(long, default_value = "1920")]
        screen_width: u32,

        /// Screen height when the file has no header
        #[arg(long, default_value = "1080")]
        screen_height: u32,

        /// Output video width (defaults to the screen width)
        #[arg(long)]
        video_width: Option<u32>,

        /// Output video height (defaults to the screen height)
        #[arg(long)]
        video_height: Option<u32>,
    },

    /// Print the frame layout of every track in a project
    Layout {
        /// Path to project.json
        path: PathBuf,

        /// Frame rate override (defaults to the project's)
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Move a clip, snapping and resolving overlaps, then commit the edit
    Move {
        /// Path to project.json
        path: PathBuf,

        /// Clip to move
        clip_id: String,

        /// Desired timeline start in ms
        start_ms: f64,

        /// Keep the leftmost clip anchored at the start of the track
        #[arg(long)]
        pin_leftmost: bool,

        /// Disable magnetic snapping
        #[arg(long)]
        no_snap: bool,

        /// Save the edited project back to PATH
        #[arg(long)]
        write: bool,
    },

    /// Load telemetry and assemble per-clip, per-chunk export slices
    Slice {
        /// Path to project.json
        path: PathBuf,

        /// Export chunk length in ms (defaults to the configured length)
        #[arg(long)]
        chunk_ms: Option<u64>,

        /// Print counts only, without event payloads
        #[arg(long)]
        summary: bool,
    },

    /// Check references, overlaps, and telemetry files of a project
    Validate {
        /// Path to project.json
        path: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli_logging(cli.verbose, cli.log_json));
    let config = AppConfig::load();

    match cli.command {
        Commands::Analyze {
            path,
            seed,
            screen_width,
            screen_height,
            video_width,
            video_height,
        } => commands::analyze::run(
            path,
            seed.unwrap_or(config.engine.detector_seed),
            (screen_width, screen_height),
            (video_width, video_height),
        ),
        Commands::Layout { path, fps } => commands::layout::run(path, fps, config.engine.fps),
        Commands::Move {
            path,
            clip_id,
            start_ms,
            pin_leftmost,
            no_snap,
            write,
        } => commands::move_clip::run(
            path,
            clip_id,
            start_ms,
            commands::move_clip::MoveOptions {
                snap: SnapConfig {
                    threshold_ms: config.engine.snap_threshold_ms,
                    enabled: !no_snap,
                },
                pin_leftmost,
                write,
            },
        ),
        Commands::Slice {
            path,
            chunk_ms,
            summary,
        } => {
            commands::slice::run(
                path,
                chunk_ms.unwrap_or(config.engine.export_chunk_ms),
                summary,
            )
            .await
        }
        Commands::Validate { path } => commands::validate::run(path).await,
        Commands::Config { init } => commands::config::run(config, init),
    }
}
