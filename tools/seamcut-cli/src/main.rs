//! SeamCut CLI: keyframe-aligned cutting with fades and an intro.
//!
//! Usage:
//!   seamcut export [EDIT FLAGS]          Run a full export
//!   seamcut preview [EDIT FLAGS] --at T  Render one preview window
//!   seamcut map [EDIT FLAGS]             Print the timeline map as JSON
//!   seamcut keyframes <PATH>             Build or load a keyframe index
//!   seamcut check                        Check external tools
//!   seamcut serve                        NDJSON requests on stdin, events on stdout

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use seamcut_common::config::AppConfig;
use seamcut_edit_model::request::EditParams;

mod commands;

#[derive(Parser)]
#[command(
    name = "seamcut",
    about = "Keyframe-aligned video cutting with fades and an intro",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/seamcut/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// The edit, as flags. Mirrors the request parameters of `serve`.
#[derive(Args, Debug, Clone)]
struct EditArgs {
    /// Edit mode: single | two
    #[arg(long, default_value = "single")]
    mode: String,

    /// Cut only the first segment (single mode)
    #[arg(long)]
    single_segment: bool,

    /// Intro resolution: fullhd | 2k (defaults to the configured one)
    #[arg(long)]
    intro_resolution: Option<String>,

    /// Intro source to prepare from
    #[arg(long)]
    intro_file: Option<String>,

    /// Primary source video
    #[arg(long)]
    video1: String,

    /// Second source video (two mode)
    #[arg(long)]
    video2: Option<String>,

    /// External audio for segment 1
    #[arg(long)]
    audio1: Option<String>,

    /// External audio for segment 2
    #[arg(long)]
    audio2: Option<String>,

    /// Segment 1 in-point (HH:MM:SS)
    #[arg(long, default_value = "00:00:00")]
    start1: String,

    /// Segment 1 out-point (HH:MM:SS, empty or 00:00:00 for end of file)
    #[arg(long, default_value = "")]
    end1: String,

    /// Segment 2 in-point
    #[arg(long, default_value = "00:00:00")]
    start2: String,

    /// Segment 2 out-point
    #[arg(long, default_value = "")]
    end2: String,

    /// Keep scratch files on the RAM disk when available
    #[arg(long)]
    use_ram: bool,

    /// Output directory (defaults to the primary source's directory)
    #[arg(short, long)]
    output_dir: Option<String>,
}

impl EditArgs {
    fn into_params(self) -> EditParams {
        EditParams {
            mode: Some(self.mode),
            is_single_segment: self.single_segment,
            intro_resolution: self.intro_resolution,
            intro_file: self.intro_file,
            video1: Some(self.video1),
            video2: self.video2,
            audio1: self.audio1,
            audio2: self.audio2,
            start1: Some(self.start1),
            end1: Some(self.end1),
            start2: Some(self.start2),
            end2: Some(self.end2),
            use_ram: self.use_ram,
            output_dir: self.output_dir,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full export
    Export {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Render one preview window of the edit
    Preview {
        #[command(flatten)]
        edit: EditArgs,

        /// Timeline position of the window start, in seconds
        #[arg(long, default_value = "0")]
        at: f64,
    },

    /// Print the timeline map as JSON
    Map {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Build or load the keyframe index of a source
    Keyframes {
        /// Source video
        path: PathBuf,

        /// In-point to resolve split points for (HH:MM:SS)
        #[arg(long)]
        start: Option<String>,

        /// Out-point to resolve split points for (HH:MM:SS)
        #[arg(long)]
        end: Option<String>,
    },

    /// Check that ffmpeg and ffprobe are available
    Check,

    /// Serve the NDJSON request protocol over stdin/stdout
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    seamcut_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export { edit } => commands::export::run(config, edit.into_params()).await,
        Commands::Preview { edit, at } => {
            commands::preview::run(config, edit.into_params(), at).await
        }
        Commands::Map { edit } => commands::map::run(config, edit.into_params()).await,
        Commands::Keyframes { path, start, end } => {
            commands::keyframes::run(config, path, start, end).await
        }
        Commands::Check => commands::check::run(config).await,
        Commands::Serve => commands::serve::run(config).await,
    }
}
