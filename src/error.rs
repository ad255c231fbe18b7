//! Custom error types for the application.
//!
//! This module defines the primary error type, `ScanError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failure modes of a scan run:
//!
//! - **`Load`**: the point source was unreadable or produced no usable points.
//!   Raised before the output device is acquired.
//! - **`Config`** / **`Configuration`**: file-level parse failures (wrapped
//!   from `figment`) versus semantic problems that pass parsing but are
//!   logically invalid (e.g. a zero angular range). Semantic problems are
//!   caught during the validation step at startup.
//! - **`RangeViolation`**: a precomputed voltage strictly exceeds the device
//!   range. This is a fail-fast safety condition: the run stops immediately
//!   rather than skipping the point, because an out-of-range command could
//!   drive an unsafe physical excursion.
//! - **`Device`**: any fault at the analog-output boundary (configure, start,
//!   write, stop). The collaborator's diagnostic text is carried verbatim.
//! - **`Io`**: wraps `std::io::Error` for file access.
//!
//! Two conditions are deliberately *not* part of the taxonomy: a single
//! malformed point-source row is skipped with a warning and loading
//! continues, and grid indices outside the intensity buffer are silently
//! ignored by the buffer itself.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Which output axis a voltage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal deflection channel.
    X,
    /// Vertical deflection channel.
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
        }
    }
}

/// The primary error type for scan runs.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The point source was unreadable or produced no usable points.
    #[error("Point source error: {0}")]
    Load(String),

    /// Configuration file or environment parsing failed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File access failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A precomputed voltage strictly exceeds the device range.
    #[error(
        "Voltage out of range at point {index}: axis {axis} computed {value} V, limit ±{limit} V"
    )]
    RangeViolation {
        /// Zero-based position of the offending point in the scan path.
        index: usize,
        /// Axis whose voltage violated the bound.
        axis: Axis,
        /// The computed voltage.
        value: f64,
        /// The configured symmetric device limit.
        limit: f64,
    },

    /// A fault at the analog-output or detector boundary.
    #[error("Device error: {0}")]
    Device(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_violation_names_point_and_value() {
        let err = ScanError::RangeViolation {
            index: 7,
            axis: Axis::Y,
            value: 6.0,
            limit: 5.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("point 7"));
        assert!(msg.contains("axis Y"));
        assert!(msg.contains("6 V"));
        assert!(msg.contains("±5 V"));
    }

    #[test]
    fn device_error_carries_diagnostic_verbatim() {
        let err = ScanError::Device("DAQmx: channel reserved by another task".into());
        assert!(err.to_string().contains("channel reserved by another task"));
    }
}
