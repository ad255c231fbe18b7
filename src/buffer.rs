//! Fixed-extent 2D intensity accumulation grid.

use tracing::trace;

/// Square grid of 8-bit intensity samples, addressed `[row = grid_y, col = grid_x]`.
///
/// The extent is fixed at construction and never changes during a scan.
/// Writes outside the extent are silently ignored: grid extent and path
/// extent are independently configured, so an out-of-extent point is a
/// tolerated mismatch, not an error.
#[derive(Debug, Clone)]
pub struct IntensityBuffer {
    size: usize,
    cells: Vec<u8>,
}

impl IntensityBuffer {
    /// Create a zero-initialized `size × size` buffer.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Buffer extent along one axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Record one sample at `(grid_x, grid_y)`; out-of-extent indices are ignored.
    pub fn record(&mut self, grid_x: i32, grid_y: i32, intensity: u8) {
        let (Ok(x), Ok(y)) = (usize::try_from(grid_x), usize::try_from(grid_y)) else {
            trace!(grid_x, grid_y, "sample outside buffer extent ignored");
            return;
        };
        if x >= self.size || y >= self.size {
            trace!(grid_x, grid_y, "sample outside buffer extent ignored");
            return;
        }
        self.cells[y * self.size + x] = intensity;
    }

    /// Read the cell at `(grid_x, grid_y)`, or `None` outside the extent.
    pub fn get(&self, grid_x: usize, grid_y: usize) -> Option<u8> {
        if grid_x >= self.size || grid_y >= self.size {
            return None;
        }
        Some(self.cells[grid_y * self.size + grid_x])
    }

    /// Raw cells in row-major order.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }
}
