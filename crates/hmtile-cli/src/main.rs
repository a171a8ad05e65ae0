//! `hmtile` command-line tool: build tile pyramids and query them.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hmtile", version, about = "Build and query heightmap tile pyramids")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cut a source raster into a multi-LOD tile pyramid
    Build(BuildArgs),
    /// Check a pyramid's index against its tile files
    Verify {
        /// Directory holding tile_index.json or tileset.json
        tiles_dir: PathBuf,
    },
    /// Query the elevation at one world position
    Elevation {
        /// World x
        #[arg(allow_hyphen_values = true)]
        x: f64,
        /// World z
        #[arg(allow_hyphen_values = true)]
        z: f64,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Extract a rectangular region of samples
    Region {
        /// Lower world x
        #[arg(allow_hyphen_values = true)]
        min_x: f64,
        /// Lower world z
        #[arg(allow_hyphen_values = true)]
        min_z: f64,
        /// Upper world x
        #[arg(allow_hyphen_values = true)]
        max_x: f64,
        /// Upper world z
        #[arg(allow_hyphen_values = true)]
        max_z: f64,
        /// Level of detail to sample
        #[arg(long, conflicts_with = "zoom")]
        lod: Option<u8>,
        /// Source pixels per output pixel; picks the LOD
        #[arg(long)]
        zoom: Option<f64>,
        /// Write every sample in meters to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Source heightmap image (PNG or TIFF)
    source: Option<PathBuf>,
    /// Output directory
    output_dir: Option<PathBuf>,
    /// YAML build configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// LOD 0 tile edge in source pixels
    #[arg(long)]
    tile_size: Option<u32>,
    /// Number of LOD levels
    #[arg(long)]
    lod_levels: Option<u8>,
    /// Floor for coarse tile edges
    #[arg(long)]
    min_tile_edge: Option<u32>,
    /// Also write flat tiles and tileset.json
    #[arg(long)]
    legacy: bool,
}

#[derive(Args)]
struct SourceArgs {
    /// Tile pyramid directory
    #[arg(long)]
    tiles: Option<PathBuf>,
    /// Raster sampled directly when no tiles are available
    #[arg(long)]
    raster: Option<PathBuf>,
    /// YAML provider configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Errors surfaced by the command-line tool.
#[derive(Debug, Error)]
pub enum CliError {
    /// Library error.
    #[error(transparent)]
    Tile(#[from] hmtile::TileError),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arguments are incomplete.
    #[error("{0}")]
    Usage(String),

    /// Verification found problems.
    #[error("{0} problem(s) found in tile index")]
    Verify(usize),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    hmtile_metrics::describe_metrics();

    let result = match cli.command {
        Command::Build(args) => commands::build(args),
        Command::Verify { tiles_dir } => commands::verify(&tiles_dir),
        Command::Elevation { x, z, source } => commands::elevation(x, z, &source),
        Command::Region {
            min_x,
            min_z,
            max_x,
            max_z,
            lod,
            zoom,
            output,
            source,
        } => commands::region(
            hmtile::WorldRect::new(min_x, min_z, max_x, max_z),
            lod,
            zoom,
            output.as_deref(),
            &source,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
