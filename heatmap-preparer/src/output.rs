use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use heatgrid::{Bar, BarPlot, Rgb};
use serde::Serialize;

/// JSON document handed to the renderer.
#[derive(Debug, Serialize)]
pub struct BarDocument<'a> {
    pub resolution: usize,
    /// Number of input points, when the grid was built in this run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_count: Option<usize>,
    pub z_max: f64,
    pub bar_width: f64,
    pub bevel_width: f64,
    pub palette: &'a [Rgb],
    pub bars: &'a [Bar],
}

impl<'a> BarDocument<'a> {
    pub fn new(plot: &'a BarPlot, point_count: Option<usize>) -> Self {
        BarDocument {
            resolution: plot.resolution,
            point_count,
            z_max: plot.z_max,
            bar_width: plot.bar_width,
            bevel_width: plot.bevel_width,
            palette: &plot.palette,
            bars: &plot.bars,
        }
    }
}

pub fn write_document<W: Write>(doc: &BarDocument, mut out: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut out, doc)?;
    out.write_all(b"\n").map_err(serde_json::Error::io)?;
    out.flush().map_err(serde_json::Error::io)
}

pub fn save_document(doc: &BarDocument, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)?;
    write_document(doc, BufWriter::new(file))?;
    Ok(())
}
