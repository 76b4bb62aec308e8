//! Command-line argument parsing for the `relief` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::Config;

/// `relief` command-line arguments.
///
/// Global values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "relief", about = "Terrain elevation ingestion and sampling")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding `manifest.json` and the tile tree.
    #[arg(long, global = true)]
    pub tiles_dir: Option<PathBuf>,

    /// Directory receiving merged grids and the analysis report.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level operations.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Decode, analyze, and merge tiles listed in the manifest.
    Ingest(IngestArgs),
    /// List the areas declared in the manifest.
    Areas,
    /// Query an exported merged grid at a world position.
    Sample(SampleArgs),
}

/// Arguments for `relief ingest`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct IngestArgs {
    /// Only ingest this area id.
    #[arg(long)]
    pub area: Option<String>,

    /// Merge every zoom with a square tile grid, not just the finest.
    #[arg(long)]
    pub all_zooms: bool,
}

/// Arguments for `relief sample`.
///
/// Without `--grid` the procedural source seeded from `world.seed` is sampled.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct SampleArgs {
    /// Path to a `<area>-z<zoom>-merged.f32` file.
    #[arg(long, requires = "meters_per_pixel")]
    pub grid: Option<PathBuf>,

    /// Ground resolution of the grid.
    #[arg(long, requires = "grid")]
    pub meters_per_pixel: Option<f32>,

    /// World X of the grid center.
    #[arg(long, default_value_t = 0.0)]
    pub origin_x: f32,

    /// World Z of the grid center.
    #[arg(long, default_value_t = 0.0)]
    pub origin_z: f32,

    /// World X to sample.
    #[arg(allow_hyphen_values = true)]
    pub x: f32,

    /// World Z to sample.
    #[arg(allow_hyphen_values = true)]
    pub z: f32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.tiles_dir {
            self.ingest.tiles_dir = dir.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.ingest.output_dir = dir.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Command::Ingest(ref ingest) = args.command {
            if let Some(ref area) = ingest.area {
                self.ingest.area = Some(area.clone());
            }
            if ingest.all_zooms {
                self.ingest.merge_all_zooms = true;
            }
        }
    }
}
