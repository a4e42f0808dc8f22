use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, span, trace, Level};

use crate::error::HeatmapError;
use crate::geometry::Coord2D;

/// Normalized coordinates may overshoot [0, 1] by rounding noise only.
const UNIT_TOLERANCE: f64 = 1e-9;

// --------------------------------------------------------------------------
// GridParams

/// Which bucket cells contribute to a target cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeighborhoodWindow {
    /// `[c - m, c + m)`: one cell more below the target than above it.
    #[default]
    HalfOpen,
    /// `[c - m, c + m]`
    Symmetric,
}

impl NeighborhoodWindow {
    /// Bucket indices scanned for target index `center`, clamped to `0..n`.
    pub fn span(&self, center: usize, m: usize, n: usize) -> Range<usize> {
        let lo = center.saturating_sub(m);
        let hi = match self {
            NeighborhoodWindow::HalfOpen => center + m,
            NeighborhoodWindow::Symmetric => center + m + 1,
        };
        lo..usize::min(hi, n)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Variance of the Gaussian kernel, in normalized units
    pub sigma_sq: f64,
    /// Cells per side (n)
    pub resolution: usize,
    /// Neighborhood half-width in cells (m)
    pub neighborhood: usize,
    pub window: NeighborhoodWindow,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams {
            sigma_sq: 0.0001,
            resolution: 20,
            neighborhood: 2,
            window: NeighborhoodWindow::HalfOpen,
        }
    }
}

impl GridParams {
    pub fn validate(&self) -> Result<(), HeatmapError> {
        if !(self.sigma_sq.is_finite() && self.sigma_sq > 0.0) {
            return Err(HeatmapError::InvalidVariance(self.sigma_sq));
        }
        if self.resolution < 2 {
            return Err(HeatmapError::InvalidResolution(self.resolution));
        }
        Ok(())
    }
}

// --------------------------------------------------------------------------
// DensityGrid

/// Square grid of densities, row-major by `i` (the x bucket).
#[derive(Clone, Debug, PartialEq)]
pub struct DensityGrid {
    resolution: usize,
    values: Vec<f64>,
}

impl DensityGrid {
    pub fn zeros(resolution: usize) -> Self {
        DensityGrid {
            resolution,
            values: vec![0.0; resolution * resolution],
        }
    }

    /// Wraps precomputed cell values, e.g. ones loaded from disk.
    pub fn from_values(resolution: usize, values: Vec<f64>) -> Result<Self, HeatmapError> {
        if resolution < 2 {
            return Err(HeatmapError::InvalidResolution(resolution));
        }
        if values.len() != resolution * resolution {
            return Err(HeatmapError::InvalidGrid(format!(
                "expected {} values for a {}x{} grid, got {}",
                resolution * resolution,
                resolution,
                resolution,
                values.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(HeatmapError::InvalidGrid(format!(
                "cell ({}, {}) holds {}, densities must be finite and non-negative",
                pos / resolution,
                pos % resolution,
                values[pos]
            )));
        }
        Ok(DensityGrid { resolution, values })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.resolution + j]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// True when no cell received any density.
    pub fn is_empty_density(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Iterates `(i, j, value)` in storage order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.resolution;
        self.values
            .iter()
            .enumerate()
            .map(move |(idx, v)| (idx / n, idx % n, *v))
    }

    /// Applies `f` to every cell, e.g. a logarithmic rescale.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> DensityGrid {
        DensityGrid {
            resolution: self.resolution,
            values: self.values.iter().map(|v| f(*v)).collect(),
        }
    }
}

// --------------------------------------------------------------------------
// BucketMap

/// Points grouped by the grid cell they fall into. Each bucket keeps its
/// points in input order.
#[derive(Debug)]
pub struct BucketMap {
    resolution: usize,
    buckets: Vec<Vec<Coord2D>>,
}

impl BucketMap {
    pub fn new(points: &[Coord2D], resolution: usize) -> Result<Self, HeatmapError> {
        let mut buckets = vec![Vec::new(); resolution * resolution];
        for (index, p) in points.iter().enumerate() {
            let out_of_range = || HeatmapError::PointOutOfRange { index, x: p.x, y: p.y };
            let i = bucket_index(p.x, resolution).ok_or_else(out_of_range)?;
            let j = bucket_index(p.y, resolution).ok_or_else(out_of_range)?;
            buckets[i * resolution + j].push(*p);
        }
        Ok(BucketMap { resolution, buckets })
    }

    pub fn bucket(&self, i: usize, j: usize) -> &[Coord2D] {
        &self.buckets[i * self.resolution + j]
    }

    pub fn occupied(&self) -> usize {
        self.buckets.iter().filter(|b| !b.is_empty()).count()
    }

    /// Kernel density at target cell `(i0, j0)`.
    fn density_at(&self, i0: usize, j0: usize, params: &GridParams) -> f64 {
        let n = self.resolution;
        let m = params.neighborhood;
        let center = Coord2D::new(i0 as f64 / (n - 1) as f64, j0 as f64 / (n - 1) as f64);
        let two_sigma_sq = 2.0 * params.sigma_sq;

        let mut acc = 0.0;
        for i in params.window.span(i0, m, n) {
            for j in params.window.span(j0, m, n) {
                for p in self.bucket(i, j) {
                    let d = &center - p;
                    acc += f64::exp(-(d.x * d.x) / two_sigma_sq - (d.y * d.y) / two_sigma_sq);
                }
            }
        }
        acc
    }
}

/// `floor(v * (n - 1))`, clamped to the grid when `v` is within rounding
/// noise of the unit interval.
fn bucket_index(v: f64, n: usize) -> Option<usize> {
    if !v.is_finite() || v < -UNIT_TOLERANCE || v > 1.0 + UNIT_TOLERANCE {
        return None;
    }
    let k = (v * (n - 1) as f64).floor();
    Some((k.max(0.0) as usize).min(n - 1))
}

/// Gaussian kernel density estimate of normalized `points` on an n×n grid.
///
/// Target cells are independent of each other and are evaluated in
/// parallel, one grid row per task. Within a cell the sum always runs over
/// buckets in increasing `(i, j)` and then in bucket order, so the result
/// does not depend on scheduling.
pub fn build_grid(points: &[Coord2D], params: &GridParams) -> Result<DensityGrid, HeatmapError> {
    let _span = span!(Level::DEBUG, "build_grid", n = params.resolution, m = params.neighborhood).entered();
    params.validate()?;

    let n = params.resolution;
    let buckets = BucketMap::new(points, n)?;
    debug!(
        "bucketed {} points into {} of {} cells",
        points.len(),
        buckets.occupied(),
        n * n
    );

    let mut grid = DensityGrid::zeros(n);
    grid.values
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(i0, row)| {
            for (j0, cell) in row.iter_mut().enumerate() {
                *cell = buckets.density_at(i0, j0, params);
            }
        });
    trace!("grid max {} sum {}", grid.max(), grid.sum());

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(sigma_sq: f64, n: usize, m: usize) -> GridParams {
        GridParams {
            sigma_sq,
            resolution: n,
            neighborhood: m,
            window: NeighborhoodWindow::HalfOpen,
        }
    }

    #[test]
    fn single_point_two_by_two() {
        let grid = build_grid(&[Coord2D::new(0.0, 0.0)], &params(1.0, 2, 1)).unwrap();
        assert_eq!(grid.get(0, 0), 1.0);
        assert_relative_eq!(grid.get(1, 1), f64::exp(-1.0));
        assert_relative_eq!(grid.get(0, 1), f64::exp(-0.5));
        assert_relative_eq!(grid.get(1, 0), f64::exp(-0.5));
    }

    #[test]
    fn empty_input_gives_zero_grid() {
        let grid = build_grid(&[], &GridParams::default()).unwrap();
        assert_eq!(grid.resolution(), 20);
        assert!(grid.is_empty_density());
        assert_eq!(grid.max(), 0.0);
    }

    #[test]
    fn far_cells_stay_exactly_zero() {
        let grid = build_grid(&[Coord2D::new(0.0, 0.0)], &params(1.0, 10, 2)).unwrap();
        for (i, j, v) in grid.iter_cells() {
            if i >= 3 || j >= 3 {
                assert_eq!(v, 0.0, "cell ({}, {})", i, j);
            } else {
                assert!(v > 0.0, "cell ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn half_open_window_is_asymmetric() {
        // Bucket (2, 2) on a 5x5 grid
        let point = [Coord2D::new(0.5, 0.5)];
        let grid = build_grid(&point, &params(1.0, 5, 1)).unwrap();
        assert_eq!(grid.get(1, 1), 0.0);
        assert!(grid.get(3, 3) > 0.0);
        assert!(grid.get(2, 2) > 0.0);

        let symmetric = GridParams {
            window: NeighborhoodWindow::Symmetric,
            ..params(1.0, 5, 1)
        };
        let grid = build_grid(&point, &symmetric).unwrap();
        assert!(grid.get(1, 1) > 0.0);
        assert_eq!(grid.get(0, 0), 0.0);
        assert_relative_eq!(grid.get(1, 1), grid.get(3, 3));
    }

    #[test]
    fn window_spans() {
        let w = NeighborhoodWindow::HalfOpen;
        assert_eq!(w.span(0, 2, 20), 0..2);
        assert_eq!(w.span(5, 2, 20), 3..7);
        assert_eq!(w.span(19, 2, 20), 17..20);
        assert_eq!(w.span(5, 0, 20), 5..5);
        let w = NeighborhoodWindow::Symmetric;
        assert_eq!(w.span(5, 2, 20), 3..8);
        assert_eq!(w.span(19, 2, 20), 17..20);
    }

    #[test]
    fn duplicates_accumulate() {
        let one = build_grid(&[Coord2D::new(0.3, 0.6)], &params(0.01, 8, 2)).unwrap();
        let three = build_grid(&[Coord2D::new(0.3, 0.6); 3], &params(0.01, 8, 2)).unwrap();
        for ((_, _, a), (_, _, b)) in one.iter_cells().zip(three.iter_cells()) {
            assert_relative_eq!(3.0 * a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn larger_variance_never_lowers_neighbor_density() {
        let points = [Coord2D::new(0.0, 0.0)];
        let narrow = build_grid(&points, &params(0.01, 4, 2)).unwrap();
        let wide = build_grid(&points, &params(0.1, 4, 2)).unwrap();
        for ((_, _, a), (_, _, b)) in narrow.iter_cells().zip(wide.iter_cells()) {
            assert!(b >= a);
        }
        assert!(wide.get(1, 0) > narrow.get(1, 0));
    }

    #[test]
    fn repeated_builds_are_bit_identical() {
        let points: Vec<Coord2D> = (0..500)
            .map(|k| {
                let t = k as f64 / 499.0;
                Coord2D::new(t, (t * 7.0).sin() * 0.5 + 0.5)
            })
            .collect();
        let p = params(0.0005, 30, 3);
        let a = build_grid(&points, &p).unwrap();
        let b = build_grid(&points, &p).unwrap();
        assert_eq!(a, b);
        assert!(a.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn rounding_noise_is_clamped_and_outliers_rejected() {
        let grid = build_grid(&[Coord2D::new(-1e-12, 1.0 + 1e-12)], &params(1.0, 3, 1)).unwrap();
        assert!(grid.get(0, 2) > 0.0);

        let err = build_grid(&[Coord2D::new(0.5, 0.5), Coord2D::new(1.5, 0.2)], &params(1.0, 3, 1)).unwrap_err();
        assert_eq!(err, HeatmapError::PointOutOfRange { index: 1, x: 1.5, y: 0.2 });
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert_eq!(
            build_grid(&[], &params(0.0, 20, 2)),
            Err(HeatmapError::InvalidVariance(0.0))
        );
        assert_eq!(
            build_grid(&[], &params(1.0, 1, 2)),
            Err(HeatmapError::InvalidResolution(1))
        );
    }

    #[test]
    fn from_values_validates() {
        assert!(DensityGrid::from_values(2, vec![0.0, 1.0, 2.0, 3.0]).is_ok());
        assert!(DensityGrid::from_values(2, vec![0.0; 3]).is_err());
        assert!(DensityGrid::from_values(2, vec![0.0, -1.0, 0.0, 0.0]).is_err());
        assert!(DensityGrid::from_values(2, vec![0.0, f64::NAN, 0.0, 0.0]).is_err());
    }
}
