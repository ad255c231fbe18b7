//! Hardware capability traits.
//!
//! Devices implement the specific capabilities they actually support rather
//! than one monolithic instrument trait. The scan pipeline only needs two:
//! a two-channel analog output port for the galvo pair, and a single-sample
//! intensity source for the detector. Both are consumed as opaque
//! collaborators; the physical driver binding lives behind these seams.
//!
//! Each capability trait:
//! - Is async (uses `#[async_trait]`)
//! - Is thread-safe (requires `Send + Sync`)
//! - Uses `anyhow::Result` so drivers can surface their native diagnostics

use anyhow::Result;
use async_trait::async_trait;

/// Capability: two-channel analog voltage output.
///
/// # Contract
/// - `configure` declares both output channels with a symmetric voltage
///   range; it must be called before `start`.
/// - `start` arms the output task; `write_pair` issues exactly one
///   synchronous sample per channel and returns once the device has
///   accepted it.
/// - `stop` releases the device. It must be safe to call on a device that
///   never started, and to call more than once: the orchestrator invokes it
///   unconditionally on every exit path.
#[async_trait]
pub trait AnalogOutput: Send + Sync {
    /// Declare the two output channels and their symmetric voltage range.
    async fn configure(&self, channel_x: &str, channel_y: &str, voltage_range_v: f64)
        -> Result<()>;

    /// Arm the configured output task.
    async fn start(&self) -> Result<()>;

    /// Write one voltage sample to each channel, synchronously.
    async fn write_pair(&self, voltage_x: f64, voltage_y: f64) -> Result<()>;

    /// Stop the output task and release the device.
    async fn stop(&self) -> Result<()>;
}

/// Capability: single-sample scalar intensity input.
///
/// One synchronous read per scan point, returning 8-bit intensity. Real
/// detector channels and the simulated generator sit behind the same trait.
#[async_trait]
pub trait IntensitySource: Send + Sync {
    /// Acquire one intensity sample.
    async fn sample(&self) -> Result<u8>;
}
