use tracing::debug;

use crate::error::HeatmapError;
use crate::geometry::{Bounds, Coord2D};

/// Maps a point set into the unit square while preserving its aspect ratio.
///
/// Both axes are divided by the larger of the two ranges, so the dominant
/// axis spans exactly [0, 1] and the other one is centered on 0.5.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normalization {
    pub bounds: Bounds,
    /// Common divisor for both axes (the larger range)
    pub scale: f64,
}

impl Normalization {
    /// Fits the normalization to `points`. Returns `Ok(None)` for an empty
    /// set, since there is nothing to fit.
    pub fn fit(points: &[Coord2D]) -> Result<Option<Normalization>, HeatmapError> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(HeatmapError::NonFiniteCoordinate { index });
        }
        let bounds = match Bounds::of(points) {
            Some(bounds) => bounds,
            None => return Ok(None),
        };
        let (range_x, range_y) = (bounds.range_x(), bounds.range_y());
        if range_x == 0.0 && range_y == 0.0 {
            return Err(HeatmapError::DegenerateInput);
        }
        let scale = if range_x >= range_y { range_x } else { range_y };
        Ok(Some(Normalization { bounds, scale }))
    }

    pub fn apply(&self, p: &Coord2D) -> Coord2D {
        // Evaluated term by term as (p - min - range / 2) / scale + 0.5
        let (min, range_x, range_y) = (self.bounds.min, self.bounds.range_x(), self.bounds.range_y());
        Coord2D {
            x: (p.x - min.x - 0.5 * range_x) / self.scale + 0.5,
            y: (p.y - min.y - 0.5 * range_y) / self.scale + 0.5,
        }
    }
}

/// Normalize `points` into the unit square. Output order matches input order.
pub fn normalize_points(points: &[Coord2D]) -> Result<Vec<Coord2D>, HeatmapError> {
    let normalization = match Normalization::fit(points)? {
        Some(n) => n,
        None => return Ok(Vec::new()),
    };
    debug!(
        "normalizing {} points: bounds {} .. {}, scale {}",
        points.len(),
        normalization.bounds.min,
        normalization.bounds.max,
        normalization.scale
    );
    Ok(points.iter().map(|p| normalization.apply(p)).collect())
}
