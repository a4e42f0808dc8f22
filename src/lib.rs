//! Density heatmaps of geospatial point data, expressed as bar charts.
//!
//! Points are normalized into the unit square, smoothed onto an n×n grid
//! with a Gaussian kernel, and every sufficiently dense cell becomes a bar
//! with a height and a color bucket. Building meshes and rendering them is
//! left to whoever consumes the [`BarPlot`].
//!
//! ```
//! use heatgrid::{Coord2D, Heatmap, HeatmapConfig};
//!
//! let points = vec![Coord2D::new(0.0, 0.0), Coord2D::new(2.0, 1.0), Coord2D::new(1.9, 0.9)];
//! let heatmap = Heatmap::compute(&points, &HeatmapConfig::default()).unwrap();
//! assert_eq!(heatmap.grid.resolution(), 20);
//! assert!(!heatmap.bars.bars.is_empty());
//! ```
mod bars;
mod colormap;
mod density;
mod error;
mod geometry;
mod normalize;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use bars::{map_bars, Bar, BarPlot, BarPlotConfig, DENSITY_THRESHOLD};
pub use colormap::{Colormap, Rgb};
pub use density::{build_grid, BucketMap, DensityGrid, GridParams, NeighborhoodWindow};
pub use error::HeatmapError;
pub use geometry::{
    project, Bounds, Coord2D, CoordGeo, IdentityProjection, Projection, ProjectionKind, Scale2D,
    Transform, Translate2D, WebMercator, EARTH_RADIUS, MAX_LATITUDE,
};
pub use normalize::{normalize_points, Normalization};

/// Settings for a full run, as read from a config file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub projection: ProjectionKind,
    pub grid: GridParams,
    pub bars: BarPlotConfig,
}

/// Result of running the whole pipeline on one point set.
#[derive(Clone, Debug)]
pub struct Heatmap {
    pub normalized: Vec<Coord2D>,
    pub grid: DensityGrid,
    pub bars: BarPlot,
}

impl Heatmap {
    /// Normalize, grid and map planar `points`.
    pub fn compute(points: &[Coord2D], config: &HeatmapConfig) -> Result<Heatmap, HeatmapError> {
        let normalized = normalize_points(points)?;
        let grid = build_grid(&normalized, &config.grid)?;
        let bars = map_bars(&grid, &config.bars)?;
        info!(
            "{} points -> {}x{} grid -> {} bars",
            points.len(),
            grid.resolution(),
            grid.resolution(),
            bars.bars.len()
        );
        Ok(Heatmap { normalized, grid, bars })
    }

    /// Project geographic coordinates with `config.projection`, then
    /// [`compute`](Heatmap::compute).
    pub fn from_geo(coords: &[CoordGeo], config: &HeatmapConfig) -> Result<Heatmap, HeatmapError> {
        let planar: Vec<Coord2D> = project(&config.projection, coords.iter().copied()).collect();
        Heatmap::compute(&planar, config)
    }
}
