use std::f64::consts::PI;
use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

// --------------------------------------------------------------------------
// CoordGeo

/// Geographic coordinate in degrees, as found in the `X`/`Y` columns of
/// the observation data (X is longitude, Y is latitude).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoordGeo {
    pub longitude: f64,
    pub latitude: f64,
}

impl fmt::Display for CoordGeo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ longitude: {}, latitude: {} }}", self.longitude, self.latitude)
    }
}

// --------------------------------------------------------------------------
// Coord2D

/// A planar point. Used both for projected coordinates and for points
/// normalized into the unit square.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord2D {
    pub x: f64,
    pub y: f64,
}

impl Coord2D {
    pub fn new(x: f64, y: f64) -> Self {
        Coord2D { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Coord2D {
    fn from((x, y): (f64, f64)) -> Self {
        Coord2D { x, y }
    }
}

impl ops::Sub<&Coord2D> for &Coord2D {
    type Output = Coord2D;

    fn sub(self, rhs: &Coord2D) -> Coord2D {
        Coord2D {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl fmt::Display for Coord2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ x: {}, y: {} }}", self.x, self.y)
    }
}

// --------------------------------------------------------------------------
// Bounds

/// Axis-aligned bounding box of a point set.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min: Coord2D,
    pub max: Coord2D,
}

impl Bounds {
    /// Returns `None` for an empty set. Non-finite coordinates are not
    /// filtered here; callers check them first.
    pub fn of(points: &[Coord2D]) -> Option<Bounds> {
        let first = points.first()?;
        let mut bounds = Bounds { min: *first, max: *first };
        for p in &points[1..] {
            bounds.min.x = f64::min(bounds.min.x, p.x);
            bounds.min.y = f64::min(bounds.min.y, p.y);
            bounds.max.x = f64::max(bounds.max.x, p.x);
            bounds.max.y = f64::max(bounds.max.y, p.y);
        }
        Some(bounds)
    }

    pub fn range_x(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn range_y(&self) -> f64 {
        self.max.y - self.min.y
    }
}

// --------------------------------------------------------------------------
// Projection

pub trait Projection<From, To> {
    fn project(&self, input: &From) -> To;
}

/// Spherical ("popular visualisation") Mercator, EPSG:3785 / EPSG:3857.
/// Output is in meters on a sphere with the WGS84 semi-major axis.
#[derive(Copy, Clone, Debug, Default)]
pub struct WebMercator;

/// WGS84 semi-major axis in meters
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which the projected map becomes square
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

impl WebMercator {
    /// Whether `coord` lies inside the area the projection is defined for.
    pub fn covers(coord: &CoordGeo) -> bool {
        coord.longitude.abs() <= 180.0 && coord.latitude.abs() <= MAX_LATITUDE
    }
}

impl Projection<CoordGeo, Coord2D> for WebMercator {
    fn project(&self, input: &CoordGeo) -> Coord2D {
        let [lon, lat] = [input.longitude, input.latitude].map(f64::to_radians);
        Coord2D {
            x: EARTH_RADIUS * lon,
            y: EARTH_RADIUS * f64::ln(f64::tan(PI / 4.0 + lat / 2.0)),
        }
    }
}

/// Passes longitude/latitude through as planar x/y, for inputs that are
/// already projected.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityProjection;

impl Projection<CoordGeo, Coord2D> for IdentityProjection {
    fn project(&self, input: &CoordGeo) -> Coord2D {
        Coord2D { x: input.longitude, y: input.latitude }
    }
}

/// Projection selected by configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectionKind {
    #[default]
    WebMercator,
    None,
}

impl Projection<CoordGeo, Coord2D> for ProjectionKind {
    fn project(&self, input: &CoordGeo) -> Coord2D {
        match self {
            ProjectionKind::WebMercator => WebMercator.project(input),
            ProjectionKind::None => IdentityProjection.project(input),
        }
    }
}

impl std::str::FromStr for ProjectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web-mercator" | "mercator" | "epsg:3785" | "epsg:3857" => Ok(ProjectionKind::WebMercator),
            "none" | "identity" => Ok(ProjectionKind::None),
            other => Err(format!("unknown projection '{}'", other)),
        }
    }
}

pub fn project<'a, A, B>(
    proj: &'a impl Projection<A, B>,
    points: impl Iterator<Item = A> + 'a,
) -> impl Iterator<Item = B> + 'a {
    points.map(move |point| proj.project(&point))
}

// --------------------------------------------------------------------------
// Transform

pub trait Transform<CoordType> {
    fn transform(&self, input: &CoordType) -> CoordType;
}

#[derive(Copy, Clone, Debug)]
pub struct Translate2D {
    pub x: f64,
    pub y: f64,
}

impl Transform<Coord2D> for Translate2D {
    fn transform(&self, input: &Coord2D) -> Coord2D {
        Coord2D { x: input.x + self.x, y: input.y + self.y }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Scale2D {
    pub x: f64,
    pub y: f64,
}

impl Transform<Coord2D> for Scale2D {
    fn transform(&self, input: &Coord2D) -> Coord2D {
        Coord2D { x: input.x * self.x, y: input.y * self.y }
    }
}
