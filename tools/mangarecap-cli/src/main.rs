//! Manga Recap CLI: turn a manga chapter into a narrated recap video.
//!
//! Usage:
//!   mangarecap render <DOCUMENT>     Run the full pipeline, streaming progress
//!   mangarecap plan <IMAGES_DIR>     Preview narration, timeline and subtitles
//!   mangarecap check                 Check external tool availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mangarecap_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "mangarecap",
    about = "Narrated recap videos from manga chapters",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a recap video; progress records are printed to stdout
    Render {
        /// PDF file, or a directory of page images with --images
        document: PathBuf,

        /// Treat DOCUMENT as a directory of page images
        #[arg(long)]
        images: bool,

        /// Directory for the finished video
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Root for per-run scratch directories
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Let a successful run delete the original page images or PDF
        /// instead of working on a copy
        #[arg(long)]
        consume_input: bool,
    },

    /// Plan narration and subtitles for a directory of page images
    Plan {
        /// Directory of page images
        images_dir: PathBuf,

        /// Write the subtitle track here (.srt or .vtt)
        #[arg(long)]
        srt: Option<PathBuf>,

        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check external tool availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    mangarecap_common::logging::init_logging(&LoggingConfig {
        level,
        json: cli.json_logs || config.logging.json,
        file: config.logging.file.clone(),
    });

    match cli.command {
        Commands::Render {
            document,
            images,
            output_dir,
            work_dir,
            consume_input,
        } => {
            commands::render::run(config, document, images, output_dir, work_dir, consume_input)
                .await
        }
        Commands::Plan {
            images_dir,
            srt,
            json,
        } => commands::plan::run(config, images_dir, srt, json).await,
        Commands::Check => commands::check::run(&config),
    }
}
