use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use heatgrid::{CoordGeo, ProjectionKind, WebMercator};
use thiserror::Error;
use tracing::{debug, info};

use crate::progress::{ProgressReader, DEFAULT_INTERVAL};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Longitude column
pub const X_COLUMN: &str = "X";
/// Latitude column
pub const Y_COLUMN: &str = "Y";

#[derive(Debug, Error)]
pub enum InputError {
    /// A row whose coordinates are missing, not numeric, or outside the
    /// area the projection can handle. `line` is 1-based, header included.
    #[error("line {line}: invalid point: {reason}")]
    InvalidPoint { line: u64, reason: String },

    #[error("input has no `{0}` column")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Wraps `reader` in a gzip decoder if the stream starts with the gzip
/// magic bytes, and passes it through untouched otherwise.
pub fn decompressing<'a, R: BufRead + 'a>(mut reader: R) -> std::io::Result<Box<dyn Read + 'a>> {
    let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if compressed {
        debug!("input is gzip-compressed");
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Open a CSV file, plain or gzip-compressed, logging read progress.
pub fn open(path: &Path) -> Result<Box<dyn Read>, InputError> {
    let file = File::open(path)?;
    let progress = ProgressReader::new(file, DEFAULT_INTERVAL, |n| {
        debug!("read {} MiB of input", n / (1024 * 1024));
    });
    Ok(decompressing(BufReader::new(progress))?)
}

/// Read the `X`/`Y` columns of a CSV stream as longitude/latitude.
///
/// Every coordinate must be a finite number; with
/// [`ProjectionKind::WebMercator`] it must also lie inside the projected
/// area. The first offending row aborts the read.
pub fn read_points<R: Read>(reader: R, projection: ProjectionKind) -> Result<Vec<CoordGeo>, InputError> {
    // Short rows are reported per line as missing values below
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(InputError::MissingColumn(name))
    };
    let (x_col, y_col) = (column(X_COLUMN)?, column(Y_COLUMN)?);

    let mut points = Vec::new();
    for record in csv.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |col: usize, name: &str| -> Result<f64, InputError> {
            let raw = record.get(col).unwrap_or("");
            if raw.is_empty() {
                return Err(InputError::InvalidPoint { line, reason: format!("missing {} value", name) });
            }
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(InputError::InvalidPoint {
                    line,
                    reason: format!("{} value '{}' is not a finite number", name, raw),
                }),
            }
        };
        let coord = CoordGeo {
            longitude: field(x_col, X_COLUMN)?,
            latitude: field(y_col, Y_COLUMN)?,
        };
        if projection == ProjectionKind::WebMercator && !WebMercator::covers(&coord) {
            return Err(InputError::InvalidPoint {
                line,
                reason: format!("{} is outside the Web Mercator area", coord),
            });
        }
        points.push(coord);
    }

    info!("read {} points", points.len());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    const SAMPLE: &str = "Site,Species,X,Y,num_Indivi\n\
                          1,ALPE4,-71.41,41.82,3\n\
                          2,CEOR7, -71.12 ,41.49,1\n\
                          3,ALPE4,-71.55,41.95,12\n";

    #[test]
    fn reads_x_and_y_columns() {
        let points = read_points(SAMPLE.as_bytes(), ProjectionKind::WebMercator).unwrap();
        assert_eq!(
            points,
            vec![
                CoordGeo { longitude: -71.41, latitude: 41.82 },
                CoordGeo { longitude: -71.12, latitude: 41.49 },
                CoordGeo { longitude: -71.55, latitude: 41.95 },
            ]
        );
    }

    #[test]
    fn gzip_and_plain_inputs_agree() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let plain = read_points(decompressing(Cursor::new(SAMPLE.as_bytes())).unwrap(), ProjectionKind::None).unwrap();
        let gz = read_points(decompressing(Cursor::new(compressed)).unwrap(), ProjectionKind::None).unwrap();
        assert_eq!(plain, gz);
        assert_eq!(plain.len(), 3);
    }

    #[test]
    fn non_numeric_value_reports_line() {
        let data = "X,Y\n1.0,2.0\nabc,3.0\n";
        match read_points(data.as_bytes(), ProjectionKind::None) {
            Err(InputError::InvalidPoint { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("abc"), "{}", reason);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_value_is_missing() {
        let data = "X,Y\n1.0,\n";
        match read_points(data.as_bytes(), ProjectionKind::None) {
            Err(InputError::InvalidPoint { line: 2, reason }) => assert!(reason.contains("missing Y")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn short_row_is_missing() {
        let data = "X,Y\n1.0,2.0\n3.0\n";
        match read_points(data.as_bytes(), ProjectionKind::None) {
            Err(InputError::InvalidPoint { line: 3, reason }) => assert!(reason.contains("missing Y")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn nan_is_rejected() {
        let data = "X,Y\nNaN,1.0\n";
        assert!(matches!(
            read_points(data.as_bytes(), ProjectionKind::None),
            Err(InputError::InvalidPoint { line: 2, .. })
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let data = "lon,Y\n1.0,2.0\n";
        assert!(matches!(
            read_points(data.as_bytes(), ProjectionKind::None),
            Err(InputError::MissingColumn("X"))
        ));
    }

    #[test]
    fn polar_points_are_rejected_for_mercator_only() {
        let data = "X,Y\n10.0,89.5\n";
        assert!(matches!(
            read_points(data.as_bytes(), ProjectionKind::WebMercator),
            Err(InputError::InvalidPoint { line: 2, .. })
        ));
        assert_eq!(read_points(data.as_bytes(), ProjectionKind::None).unwrap().len(), 1);
    }

    #[test]
    fn header_only_yields_no_points() {
        assert!(read_points("X,Y\n".as_bytes(), ProjectionKind::None).unwrap().is_empty());
    }
}
