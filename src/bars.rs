use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::colormap::{Colormap, Rgb};
use crate::density::DensityGrid;
use crate::error::HeatmapError;
use crate::geometry::{Coord2D, Scale2D, Transform, Translate2D};

/// Cells at or below this (possibly log-scaled) density get no bar.
pub const DENSITY_THRESHOLD: f64 = 0.001;

/// Decay constant of the density-to-color curve `1 - exp(-(z / z_max) / 0.2)`
const COLOR_FALLOFF: f64 = 0.2;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarPlotConfig {
    /// Height of the tallest bar
    pub height: f64,
    /// Side length of the square the grid is laid out on
    pub width: f64,
    /// Fraction of a cell's footprint covered by its bar
    pub bar_scale: f64,
    pub num_colors: usize,
    /// Passed through to the renderer for the bevel modifier
    pub bevel_width: f64,
    pub logarithmic: bool,
    pub colormap: Colormap,
}

impl Default for BarPlotConfig {
    fn default() -> Self {
        BarPlotConfig {
            height: 4.0,
            width: 10.0,
            bar_scale: 0.9,
            num_colors: 10,
            bevel_width: 0.015,
            logarithmic: false,
            colormap: Colormap::Summer,
        }
    }
}

impl BarPlotConfig {
    pub fn validate(&self) -> Result<(), HeatmapError> {
        if self.num_colors == 0 {
            return Err(HeatmapError::InvalidColorCount(self.num_colors));
        }
        for (name, value) in [
            ("height", self.height),
            ("width", self.width),
            ("bar_scale", self.bar_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(HeatmapError::InvalidBarGeometry { name, value });
            }
        }
        Ok(())
    }
}

/// A single bar of the plot. `x`/`y` is the center of its footprint in
/// world units, with the grid centered on the origin.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub i: usize,
    pub j: usize,
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub color_bucket: usize,
}

/// Everything a renderer needs to build the bar chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarPlot {
    pub resolution: usize,
    pub z_max: f64,
    pub bar_width: f64,
    pub bevel_width: f64,
    /// Color of each bucket, indexed by `Bar::color_bucket`
    pub palette: Vec<Rgb>,
    pub bars: Vec<Bar>,
}

impl BarPlot {
    /// Bars grouped by color bucket, so that each group can become one mesh
    /// with one material.
    pub fn groups(&self) -> Vec<Vec<&Bar>> {
        let mut groups = vec![Vec::new(); self.palette.len()];
        for bar in &self.bars {
            groups[bar.color_bucket].push(bar);
        }
        groups
    }
}

/// Derive bar heights and color buckets from a density grid.
pub fn map_bars(grid: &DensityGrid, config: &BarPlotConfig) -> Result<BarPlot, HeatmapError> {
    config.validate()?;

    let grid = if config.logarithmic {
        grid.map_values(|v| (v + 1.0).ln())
    } else {
        grid.clone()
    };
    let n = grid.resolution();
    let z_max = grid.max();
    let bar_width = config.bar_scale * config.width / n as f64;

    // Unit grid coordinates -> world coordinates centered on the origin
    let center = Translate2D { x: -0.5, y: -0.5 };
    let to_world = Scale2D { x: config.width, y: config.width };

    let mut bars = Vec::new();
    if z_max > 0.0 {
        for (i, j, z) in grid.iter_cells() {
            if z <= DENSITY_THRESHOLD {
                continue;
            }
            let rel = z / z_max;
            let t = 1.0 - f64::exp(-rel / COLOR_FALLOFF);
            let color_bucket = usize::min((config.num_colors as f64 * t) as usize, config.num_colors - 1);
            let unit = Coord2D::new(i as f64 / (n - 1) as f64, j as f64 / (n - 1) as f64);
            let pos = to_world.transform(&center.transform(&unit));
            bars.push(Bar {
                i,
                j,
                x: pos.x,
                y: pos.y,
                height: (config.height - bar_width) * rel + bar_width,
                color_bucket,
            });
        }
    }
    debug!(
        "mapped {} of {} cells to bars (z_max {}, bar width {})",
        bars.len(),
        n * n,
        z_max,
        bar_width
    );

    Ok(BarPlot {
        resolution: n,
        z_max,
        bar_width,
        bevel_width: config.bevel_width,
        palette: config.colormap.palette(config.num_colors),
        bars,
    })
}
