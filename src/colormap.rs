use serde::{Deserialize, Serialize};

/// 8-bit RGB color
pub type Rgb = (u8, u8, u8);

/// Available colormaps for coloring the density buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Summer,  // Green -> Yellow
    Viridis, // Purple -> Blue -> Green -> Yellow
    Jet,     // Blue -> Cyan -> Green -> Yellow -> Red
    Turbo,   // Blue -> Cyan -> Green -> Yellow -> Orange -> Red
}

impl Colormap {
    /// Map a normalized value [0.0, 1.0] to an RGB color
    pub fn map(&self, value: f64) -> Rgb {
        let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };

        let (r, g, b) = match self {
            Colormap::Summer => summer_colormap(v),
            Colormap::Viridis => interpolate(&VIRIDIS, v),
            Colormap::Jet => interpolate(&JET, v),
            Colormap::Turbo => interpolate(&TURBO, v),
        };
        (to_byte(r), to_byte(g), to_byte(b))
    }

    /// One color per bucket: bucket `k` of `n` gets `map(k / n)`.
    pub fn palette(&self, num_colors: usize) -> Vec<Rgb> {
        (0..num_colors)
            .map(|k| self.map(k as f64 / num_colors as f64))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Summer => "summer",
            Colormap::Viridis => "viridis",
            Colormap::Jet => "jet",
            Colormap::Turbo => "turbo",
        }
    }
}

impl std::str::FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summer" => Ok(Colormap::Summer),
            "viridis" => Ok(Colormap::Viridis),
            "jet" => Ok(Colormap::Jet),
            "turbo" => Ok(Colormap::Turbo),
            other => Err(format!(
                "unknown colormap '{}' (expected summer, viridis, jet or turbo)",
                other
            )),
        }
    }
}

fn to_byte(c: f64) -> u8 {
    (c * 255.0) as u8
}

/// Summer colormap: linear from (0, 0.5, 0.4) to (1, 1, 0.4)
fn summer_colormap(v: f64) -> (f64, f64, f64) {
    (v, 0.5 + v / 2.0, 0.4)
}

// Jet breakpoints sit on multiples of 1/8, so nine evenly spaced control
// points describe it exactly.
const JET: [(f64, f64, f64); 9] = [
    (0.0, 0.0, 0.5), // Dark blue
    (0.0, 0.0, 1.0),
    (0.0, 0.5, 1.0),
    (0.0, 1.0, 1.0), // Cyan
    (0.5, 1.0, 0.5),
    (1.0, 1.0, 0.0), // Yellow
    (1.0, 0.5, 0.0),
    (1.0, 0.0, 0.0), // Red
    (0.5, 0.0, 0.0), // Dark red
];

// Viridis control points (perceptually uniform, colorblind-friendly)
const VIRIDIS: [(f64, f64, f64); 5] = [
    (0.267004, 0.004874, 0.329415), // Dark purple
    (0.282623, 0.140926, 0.457517), // Purple-blue
    (0.163625, 0.471133, 0.558148), // Blue-green
    (0.477504, 0.821444, 0.318195), // Yellow-green
    (0.993248, 0.906157, 0.143936), // Yellow
];

// Simplified turbo approximation
const TURBO: [(f64, f64, f64); 6] = [
    (0.18995, 0.07176, 0.23217), // Dark blue
    (0.11770, 0.56700, 0.75088), // Cyan
    (0.17205, 0.88797, 0.54362), // Green
    (0.89567, 0.99343, 0.29685), // Yellow
    (0.97809, 0.55414, 0.10540), // Orange
    (0.78801, 0.08080, 0.06051), // Red
];

/// Piecewise-linear interpolation between evenly spaced control points
fn interpolate(points: &[(f64, f64, f64)], v: f64) -> (f64, f64, f64) {
    let last = points.len() - 1;
    let idx = v * last as f64;
    let i = idx.floor() as usize;
    if i >= last {
        return points[last];
    }
    let t = idx - i as f64;

    let (r0, g0, b0) = points[i];
    let (r1, g1, b1) = points[i + 1];
    (r0 + t * (r1 - r0), g0 + t * (g1 - g0), b0 + t * (b1 - b0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summer_endpoints() {
        assert_eq!(Colormap::Summer.map(0.0), (0, 127, 102));
        assert_eq!(Colormap::Summer.map(1.0), (255, 255, 102));
    }

    #[test]
    fn values_are_clamped() {
        for cmap in [Colormap::Summer, Colormap::Viridis, Colormap::Jet, Colormap::Turbo] {
            assert_eq!(cmap.map(-3.0), cmap.map(0.0));
            assert_eq!(cmap.map(7.0), cmap.map(1.0));
            assert_eq!(cmap.map(f64::NAN), cmap.map(0.0));
        }
    }

    #[test]
    fn viridis_hits_control_points() {
        assert_eq!(Colormap::Viridis.map(0.0), (68, 1, 84));
        assert_eq!(Colormap::Viridis.map(1.0), (253, 231, 36));
    }

    #[test]
    fn jet_hits_breakpoints() {
        assert_eq!(Colormap::Jet.map(0.0), (0, 0, 127));
        assert_eq!(Colormap::Jet.map(0.375), (0, 255, 255));
        assert_eq!(Colormap::Jet.map(0.625), (255, 255, 0));
        assert_eq!(Colormap::Jet.map(1.0), (127, 0, 0));
    }

    #[test]
    fn jet_is_blue_then_red() {
        let (r, _, b) = Colormap::Jet.map(0.0);
        assert!(b > r);
        let (r, _, b) = Colormap::Jet.map(0.9);
        assert!(r > b);
    }

    #[test]
    fn palette_has_one_color_per_bucket() {
        let palette = Colormap::Summer.palette(10);
        assert_eq!(palette.len(), 10);
        assert_eq!(palette[0], Colormap::Summer.map(0.0));
        assert_eq!(palette[5], Colormap::Summer.map(0.5));
        assert!(Colormap::Viridis.palette(0).is_empty());
    }

    #[test]
    fn parses_names() {
        assert_eq!("Viridis".parse::<Colormap>(), Ok(Colormap::Viridis));
        assert_eq!("JET".parse::<Colormap>(), Ok(Colormap::Jet));
        assert!("magma".parse::<Colormap>().is_err());
        for cmap in [Colormap::Summer, Colormap::Viridis, Colormap::Jet, Colormap::Turbo] {
            assert_eq!(cmap.name().parse::<Colormap>(), Ok(cmap));
        }
    }
}
