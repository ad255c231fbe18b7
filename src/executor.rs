//! The real-time scan loop.
//!
//! [`ScanExecutor`] walks a precomputed [`ScanPath`] in order. Per point:
//!
//! 1. Validate both voltages against the device range. A strict excess is a
//!    [`ScanError::RangeViolation`] and aborts the run — fail-fast device
//!    safety, not a skippable condition.
//! 2. Issue exactly one synchronous sample-pair write, bounded by the
//!    configured timeout. Any write fault is fatal: a voltage lost
//!    mid-trajectory cannot be retried without replaying settle semantics.
//! 3. Take one intensity sample and record it into the buffer (out-of-extent
//!    indices tolerated by the buffer).
//! 4. Notify the observer — live preview and the abort check. Rendering is
//!    best-effort and subordinate to output timing; only the returned
//!    [`ScanControl`] matters here.
//! 5. Sleep the settle delay so the deflection stabilizes before the next
//!    command.
//!
//! Cancellation is observed at point granularity: the observer's `Abort`
//! stops the loop cleanly between two points, never mid-write.

use crate::buffer::IntensityBuffer;
use crate::error::{Axis, ScanError, ScanResult};
use crate::hardware::{AnalogOutput, IntensitySource};
use crate::path::ScanPath;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Observer verdict after each point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Proceed to the next point.
    Continue,
    /// Stop the run cleanly without executing the remaining path.
    Abort,
}

/// How a run ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every point in the path was executed.
    Completed,
    /// The run was cancelled between two points.
    Aborted,
}

/// Executes a scan path against an analog output and an intensity source.
pub struct ScanExecutor<'a> {
    device: &'a dyn AnalogOutput,
    detector: &'a dyn IntensitySource,
    voltage_range_v: f64,
    write_timeout: Duration,
    settle: Duration,
}

impl<'a> ScanExecutor<'a> {
    /// Create an executor over an already configured and started device.
    pub fn new(
        device: &'a dyn AnalogOutput,
        detector: &'a dyn IntensitySource,
        voltage_range_v: f64,
        write_timeout: Duration,
        settle: Duration,
    ) -> Self {
        Self {
            device,
            detector,
            voltage_range_v,
            write_timeout,
            settle,
        }
    }

    /// Run the path to completion, abort, or fatal error.
    ///
    /// `observer` is invoked after each point's sample is recorded; it gets
    /// the point index and the buffer, and decides whether to continue.
    pub async fn run<F>(
        &self,
        path: &ScanPath,
        buffer: &mut IntensityBuffer,
        mut observer: F,
    ) -> ScanResult<ScanOutcome>
    where
        F: FnMut(usize, &IntensityBuffer) -> ScanControl,
    {
        for (index, point) in path.iter().enumerate() {
            self.check_range(index, Axis::X, point.voltage_x)?;
            self.check_range(index, Axis::Y, point.voltage_y)?;

            self.write_point(point.voltage_x, point.voltage_y).await?;

            let intensity = self
                .detector
                .sample()
                .await
                .map_err(|e| ScanError::Device(format!("detector read failed: {e:#}")))?;
            buffer.record(point.grid_x, point.grid_y, intensity);

            if observer(index, buffer) == ScanControl::Abort {
                info!(point = index, total = path.len(), "scan aborted");
                return Ok(ScanOutcome::Aborted);
            }

            sleep(self.settle).await;
        }

        debug!(points = path.len(), "scan path completed");
        Ok(ScanOutcome::Completed)
    }

    fn check_range(&self, index: usize, axis: Axis, value: f64) -> ScanResult<()> {
        // Inclusive bound: a voltage exactly at ±range is accepted.
        // The range-contains form also rejects NaN.
        let limit = self.voltage_range_v;
        if (-limit..=limit).contains(&value) {
            Ok(())
        } else {
            Err(ScanError::RangeViolation {
                index,
                axis,
                value,
                limit,
            })
        }
    }

    async fn write_point(&self, voltage_x: f64, voltage_y: f64) -> ScanResult<()> {
        match timeout(self.write_timeout, self.device.write_pair(voltage_x, voltage_y)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ScanError::Device(format!("{e:#}"))),
            Err(_) => Err(ScanError::Device(format!(
                "analog write timed out after {:?}",
                self.write_timeout
            ))),
        }
    }
}
