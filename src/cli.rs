use crate::config::{OutputFormat, Platform};
use crate::preset::DEFAULT_PRESET_FILE;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Compute flowlines through a 2D velocity field with grd2stream
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Preset file
    #[arg(long, default_value = DEFAULT_PRESET_FILE)]
    pub presets: PathBuf,

    /// Render commands for this platform instead of the current one
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Miniconda install holding the GMT6 environment [default: ~/miniconda3]
    #[arg(long, env = "GRD2STREAM_CONDA_ROOT")]
    pub conda_root: Option<PathBuf>,

    /// Run this grd2stream binary directly instead of through conda
    #[arg(long, env = "GRD2STREAM_BIN")]
    pub tool: Option<PathBuf>,

    /// Log progress details
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a flowline from a seed point
    Run(RunArgs),
    /// Print the grd2stream command with a seed file placeholder
    Command(SelectionArgs),
    /// Manage stored presets
    #[command(subcommand)]
    Preset(PresetCommand),
    /// Check that grd2stream and its environment are installed
    Check,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SelectionArgs {
    /// Load parameters from this preset
    #[arg(long, conflicts_with_all = ["raster1", "raster2"])]
    pub preset: Option<String>,

    /// Raster with the x velocity component (GDAL source string)
    #[arg(long, required_unless_present = "preset")]
    pub raster1: Option<String>,

    /// Raster with the y velocity component (GDAL source string)
    #[arg(long, required_unless_present = "preset")]
    pub raster2: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub band1: u32,

    #[arg(long, default_value_t = 1)]
    pub band2: u32,

    #[arg(long)]
    pub name1: Option<String>,

    #[arg(long)]
    pub name2: Option<String>,

    /// Integrate against the flow direction
    #[arg(short, long)]
    pub backward: bool,

    /// Integration step size (default: derived from grid spacing)
    #[arg(short = 'd', long)]
    pub step_size: Option<String>,

    /// Maximum integration time
    #[arg(short = 'T', long)]
    pub max_time: Option<String>,

    /// Maximum number of steps (grd2stream default: 10000)
    #[arg(short = 'n', long)]
    pub max_steps: Option<String>,

    /// Extra output columns
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Seed point x coordinate, in the project CRS
    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,

    /// Seed point y coordinate, in the project CRS
    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,

    /// CRS tag attached to the output
    #[arg(long, default_value = "EPSG:4326")]
    pub crs: String,

    /// Output file (.csv or .geojson); prints CSV to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save the parameters as a preset after a successful run
    #[arg(long)]
    pub save_as: Option<String>,

    /// Replace an existing preset with the same name
    #[arg(long, requires = "save_as")]
    pub overwrite: bool,
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// List preset names
    List,
    /// Show one preset as JSON
    Show { name: String },
    /// Delete a preset
    Delete { name: String },
    /// Rename a preset
    Rename { old: String, new: String },
    /// Write one preset to a separate file
    Export { name: String, file: PathBuf },
    /// Merge presets from a file
    Import { file: PathBuf },
}

pub fn get_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn run_with_rasters_and_negative_seed() {
        let args = Args::try_parse_from([
            "grd2stream_runner",
            "run",
            "--raster1",
            "NETCDF:/d/v.nc:vx",
            "--raster2",
            "NETCDF:/d/v.nc:vy",
            "-d",
            "0.5",
            "--format",
            "velocity",
            "--x",
            "-1500.5",
            "--y",
            "200",
        ])
        .unwrap();
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.x, -1500.5);
        assert_eq!(run.selection.step_size.as_deref(), Some("0.5"));
        assert_eq!(run.selection.format, Some(OutputFormat::Velocity));
    }

    #[test]
    fn preset_and_rasters_conflict() {
        let result = Args::try_parse_from([
            "grd2stream_runner",
            "command",
            "--preset",
            "p",
            "--raster1",
            "a.tif",
        ]);
        assert!(result.is_err());
    }
}
