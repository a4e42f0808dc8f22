use thiserror::Error;

/// Errors produced by the numeric pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatmapError {
    /// Every point coincides, so there is no range to scale by.
    #[error("cannot normalize points: both coordinate ranges are zero")]
    DegenerateInput,

    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// A point handed to the grid builder lies outside the unit square.
    #[error("point {index} at ({x}, {y}) lies outside the unit square")]
    PointOutOfRange { index: usize, x: f64, y: f64 },

    #[error("kernel variance must be positive and finite, got {0}")]
    InvalidVariance(f64),

    #[error("grid resolution must be at least 2, got {0}")]
    InvalidResolution(usize),

    #[error("number of colors must be at least 1, got {0}")]
    InvalidColorCount(usize),

    #[error("bar geometry parameter `{name}` must be positive and finite, got {value}")]
    InvalidBarGeometry { name: &'static str, value: f64 },

    #[error("invalid density grid: {0}")]
    InvalidGrid(String),
}
