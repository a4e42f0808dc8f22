mod config;
mod grid_file;
mod input;
mod output;
mod progress;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use heatgrid::{map_bars, Colormap, Heatmap, HeatmapConfig, NeighborhoodWindow, ProjectionKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

use output::BarDocument;

#[derive(Parser)]
#[command(about = "Turn point observations into a 3D heatmap bar description")]
struct ClArgs {
    #[command(subcommand)]
    command: Command,

    /// Verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides it
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbosity: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Read a CSV of X/Y coordinates and compute the bars
    Prepare(PrepareArgs),
    /// Recompute the bars from a previously saved grid file
    Bars(BarsArgs),
}

#[derive(Args)]
struct PrepareArgs {
    /// Input CSV file with `X` (longitude) and `Y` (latitude) columns; may be gzip-compressed
    #[arg()]
    input: PathBuf,

    /// Output JSON file path
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Also save the density grid to this file
    #[arg(long)]
    save_grid: Option<PathBuf>,

    /// Projection applied to the input coordinates (web-mercator, none)
    #[arg(long)]
    projection: Option<ProjectionKind>,

    /// Variance of the Gaussian kernel
    #[arg(long)]
    sigma_sq: Option<f64>,

    /// Grid cells per side
    #[arg(short = 'n', long)]
    resolution: Option<usize>,

    /// Neighborhood half-width in cells
    #[arg(short = 'm', long)]
    neighborhood: Option<usize>,

    /// Scan the neighborhood symmetrically instead of the default half-open window
    #[arg(long)]
    symmetric_window: bool,

    #[command(flatten)]
    bars: BarOverrides,
}

#[derive(Args)]
struct BarsArgs {
    /// Grid file written by `prepare --save-grid`
    #[arg()]
    grid: PathBuf,

    /// Output JSON file path
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    #[command(flatten)]
    bars: BarOverrides,
}

#[derive(Args)]
struct BarOverrides {
    /// TOML config file; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Color scheme to use (summer, viridis, jet, turbo)
    #[arg(long)]
    colormap: Option<Colormap>,

    /// Scale densities logarithmically before mapping them to heights
    #[arg(long)]
    logarithmic: bool,

    /// Number of color buckets
    #[arg(long)]
    num_colors: Option<usize>,
}

impl BarOverrides {
    fn load_config(&self) -> anyhow::Result<HeatmapConfig> {
        let mut config = config::load_or_default(self.config.as_deref())?;
        if let Some(colormap) = self.colormap {
            config.bars.colormap = colormap;
        }
        if self.logarithmic {
            config.bars.logarithmic = true;
        }
        if let Some(num_colors) = self.num_colors {
            config.bars.num_colors = num_colors;
        }
        Ok(config)
    }
}

impl PrepareArgs {
    fn load_config(&self) -> anyhow::Result<HeatmapConfig> {
        let mut config = self.bars.load_config()?;
        if let Some(projection) = self.projection {
            config.projection = projection;
        }
        if let Some(sigma_sq) = self.sigma_sq {
            config.grid.sigma_sq = sigma_sq;
        }
        if let Some(resolution) = self.resolution {
            config.grid.resolution = resolution;
        }
        if let Some(neighborhood) = self.neighborhood {
            config.grid.neighborhood = neighborhood;
        }
        if self.symmetric_window {
            config.grid.window = NeighborhoodWindow::Symmetric;
        }
        Ok(config)
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> anyhow::Result<()> {
    let args = ClArgs::parse();
    init_logging(args.verbosity);

    match args.command {
        Command::Prepare(prepare) => run_prepare(&prepare),
        Command::Bars(bars) => run_bars(&bars),
    }
}

fn run_prepare(args: &PrepareArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;
    info!("loading points from: {}", args.input.display());
    let reader = input::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let coords = input::read_points(reader, config.projection)
        .with_context(|| format!("reading points from {}", args.input.display()))?;

    let heatmap = Heatmap::from_geo(&coords, &config).context("computing heatmap")?;

    if let Some(path) = &args.save_grid {
        grid_file::save_grid_to_file(&heatmap.grid, path)
            .with_context(|| format!("saving grid to {}", path.display()))?;
        info!("grid saved to: {}", path.display());
    }
    write_output(&BarDocument::new(&heatmap.bars, Some(coords.len())), &args.output)
}

fn run_bars(args: &BarsArgs) -> anyhow::Result<()> {
    let config = args.bars.load_config()?;
    info!("loading grid from: {}", args.grid.display());
    let grid = grid_file::load_grid_from_file(&args.grid)
        .with_context(|| format!("loading grid from {}", args.grid.display()))?;
    let plot = map_bars(&grid, &config.bars).context("mapping bars")?;
    write_output(&BarDocument::new(&plot, None), &args.output)
}

fn write_output(doc: &BarDocument, path: &Path) -> anyhow::Result<()> {
    output::save_document(doc, path).with_context(|| format!("writing {}", path.display()))?;
    info!("{} bars written to: {}", doc.bars.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        ClArgs::command().debug_assert();
    }

    #[test]
    fn prepare_flags_override_defaults() {
        let args = ClArgs::try_parse_from([
            "heatmap-preparer",
            "prepare",
            "data.csv",
            "-o",
            "bars.json",
            "-n",
            "80",
            "--sigma-sq",
            "0.00005",
            "--colormap",
            "viridis",
            "--symmetric-window",
            "--projection",
            "none",
        ])
        .unwrap();
        let Command::Prepare(prepare) = args.command else {
            panic!("expected prepare");
        };
        let config = prepare.load_config().unwrap();
        assert_eq!(config.grid.resolution, 80);
        assert_eq!(config.grid.sigma_sq, 0.00005);
        assert_eq!(config.grid.neighborhood, 2);
        assert_eq!(config.grid.window, NeighborhoodWindow::Symmetric);
        assert_eq!(config.projection, ProjectionKind::None);
        assert_eq!(config.bars.colormap, Colormap::Viridis);
        assert!(!config.bars.logarithmic);
    }

    #[test]
    fn bars_subcommand_parses() {
        let args = ClArgs::try_parse_from([
            "heatmap-preparer",
            "-vv",
            "bars",
            "grid.bin",
            "--output",
            "bars.json",
            "--logarithmic",
        ])
        .unwrap();
        assert_eq!(args.verbosity, 2);
        let Command::Bars(bars) = args.command else {
            panic!("expected bars");
        };
        assert_eq!(bars.grid, PathBuf::from("grid.bin"));
        assert!(bars.bars.load_config().unwrap().bars.logarithmic);
    }

    #[test]
    fn unknown_colormap_is_a_usage_error() {
        assert!(ClArgs::try_parse_from([
            "heatmap-preparer",
            "bars",
            "grid.bin",
            "-o",
            "out.json",
            "--colormap",
            "magma",
        ])
        .is_err());
    }
}
