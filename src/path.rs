//! Scan path loading and precomputation.
//!
//! A point source is a comma-delimited stream of `(grid_x, grid_y)` index
//! pairs with one header line. Loading materializes it into a [`ScanPath`]
//! of [`ScanPoint`]s with the output voltages precomputed, in source order.
//! Order is load-bearing: it is the physical trajectory the device will
//! follow, so no reordering and no deduplication happen here.
//!
//! Malformed rows are skipped with a warning; they do not fail the load.
//! Voltages are *not* range-checked here — precomputed values may be out of
//! range and are rejected at consumption time by the scan executor.

use crate::error::{ScanError, ScanResult};
use crate::transform::TransformParams;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One precomputed scan target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    /// Horizontal grid index.
    pub grid_x: i32,
    /// Vertical grid index.
    pub grid_y: i32,
    /// Precomputed X-axis output voltage.
    pub voltage_x: f64,
    /// Precomputed Y-axis output voltage.
    pub voltage_y: f64,
}

/// Ordered sequence of scan targets; insertion order is traversal order.
#[derive(Debug, Clone, Default)]
pub struct ScanPath {
    points: Vec<ScanPoint>,
}

impl ScanPath {
    /// Number of points in the path.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path contains no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over points in traversal order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScanPoint> {
        self.points.iter()
    }

    /// The points in traversal order.
    pub fn points(&self) -> &[ScanPoint] {
        &self.points
    }
}

impl<'a> IntoIterator for &'a ScanPath {
    type Item = &'a ScanPoint;
    type IntoIter = std::slice::Iter<'a, ScanPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Load and precompute a scan path from a point-source file.
///
/// An unreadable file is a [`ScanError::Load`]; an empty result is returned
/// as-is and is the caller's signal to abort before touching the device.
pub fn load_path_file<P: AsRef<Path>>(
    path: P,
    params: &TransformParams,
) -> ScanResult<ScanPath> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ScanError::Load(format!("cannot open {}: {e}", path.display())))?;
    let loaded = load_path(file, params)?;
    debug!(
        points = loaded.len(),
        source = %path.display(),
        "scan path loaded"
    );
    Ok(loaded)
}

/// Load and precompute a scan path from any reader.
///
/// The first row is treated as a header and discarded. Each remaining row
/// must carry two integer fields; rows that do not are skipped with a
/// warning and loading continues.
pub fn load_path<R: Read>(reader: R, params: &TransformParams) -> ScanResult<ScanPath> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    let mut skipped = 0usize;

    for (row, record) in csv_reader.records().enumerate() {
        // Row numbers are 1-based and count from after the header.
        let line = row + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(line, "skipping malformed row: {e}");
                skipped += 1;
                continue;
            }
        };

        match parse_record(&record) {
            Some((grid_x, grid_y)) => {
                let (voltage_x, voltage_y) = params.grid_to_voltage(grid_x, grid_y);
                points.push(ScanPoint {
                    grid_x,
                    grid_y,
                    voltage_x,
                    voltage_y,
                });
            }
            None => {
                warn!(line, row = ?record, "skipping malformed row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, kept = points.len(), "point source had malformed rows");
    }

    Ok(ScanPath { points })
}

fn parse_record(record: &csv::StringRecord) -> Option<(i32, i32)> {
    let x = record.get(0)?.parse::<i32>().ok()?;
    let y = record.get(1)?.parse::<i32>().ok()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: TransformParams = TransformParams {
        step_size_deg: 0.01,
        voltage_range_v: 5.0,
        angle_range_deg: 22.5,
    };

    #[test]
    fn skips_malformed_rows_and_keeps_the_rest() {
        let source = "x,y\n1,2\nbad,row\n3,4\n";
        let path = load_path(source.as_bytes(), &PARAMS).expect("load");
        assert_eq!(path.len(), 2);
        assert_eq!(path.points()[0].grid_x, 1);
        assert_eq!(path.points()[0].grid_y, 2);
        assert_eq!(path.points()[1].grid_x, 3);
        assert_eq!(path.points()[1].grid_y, 4);
    }

    #[test]
    fn preserves_source_order_and_duplicates() {
        let source = "x,y\n5,5\n1,1\n5,5\n2,2\n";
        let path = load_path(source.as_bytes(), &PARAMS).expect("load");
        let indices: Vec<(i32, i32)> = path.iter().map(|p| (p.grid_x, p.grid_y)).collect();
        assert_eq!(indices, vec![(5, 5), (1, 1), (5, 5), (2, 2)]);
    }

    #[test]
    fn precomputes_voltages_with_transform() {
        let source = "x,y\n100,200\n";
        let path = load_path(source.as_bytes(), &PARAMS).expect("load");
        let point = path.points()[0];
        assert_eq!(point.voltage_x, 5.0 * (100.0 * 0.01) / 22.5);
        assert_eq!(point.voltage_y, 5.0 * (200.0 * 0.01) / 22.5);
    }

    #[test]
    fn header_only_source_is_empty_not_error() {
        let path = load_path("x,y\n".as_bytes(), &PARAMS).expect("load");
        assert!(path.is_empty());
    }

    #[test]
    fn negative_indices_are_valid_rows() {
        let source = "x,y\n-10,-20\n";
        let path = load_path(source.as_bytes(), &PARAMS).expect("load");
        assert_eq!(path.points()[0].grid_x, -10);
        assert!(path.points()[0].voltage_x < 0.0);
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = load_path_file("/nonexistent/points.csv", &PARAMS).unwrap_err();
        assert!(matches!(err, ScanError::Load(_)));
    }
}
