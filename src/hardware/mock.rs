//! Mock hardware implementations.
//!
//! Simulated devices for running and testing without physical hardware.
//! All mocks use async-safe state (tokio locks, no blocking sleeps).
//!
//! - [`MockGalvoPair`] — analog output that records every write and can
//!   inject a failure at a chosen write index
//! - [`SimulatedDetector`] — bounded pseudo-random intensity source

use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::hardware::capabilities::{AnalogOutput, IntensitySource};

#[derive(Debug, Default)]
struct GalvoState {
    channels: Option<(String, String)>,
    voltage_range_v: f64,
    started: bool,
    writes: Vec<(f64, f64)>,
    stop_count: usize,
}

/// Mock two-channel galvo output.
///
/// Tracks the configure/start/write/stop lifecycle and records every sample
/// pair it accepts, so tests can assert exactly what would have reached the
/// physical device. [`MockGalvoPair::failing_at_write`] makes the Nth write
/// return an error, to exercise the fatal-write path.
#[derive(Debug, Default)]
pub struct MockGalvoPair {
    state: RwLock<GalvoState>,
    fail_on_write: Option<usize>,
}

impl MockGalvoPair {
    /// Create a mock device that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock device whose write number `index` (zero-based) fails.
    pub fn failing_at_write(index: usize) -> Self {
        Self {
            state: RwLock::new(GalvoState::default()),
            fail_on_write: Some(index),
        }
    }

    /// All sample pairs accepted so far, in write order.
    pub async fn writes(&self) -> Vec<(f64, f64)> {
        self.state.read().await.writes.clone()
    }

    /// Whether the output task is currently armed.
    pub async fn is_started(&self) -> bool {
        self.state.read().await.started
    }

    /// How many times `stop` has been called.
    pub async fn stop_count(&self) -> usize {
        self.state.read().await.stop_count
    }

    /// The configured channel pair, if any.
    pub async fn channels(&self) -> Option<(String, String)> {
        self.state.read().await.channels.clone()
    }
}

#[async_trait]
impl AnalogOutput for MockGalvoPair {
    async fn configure(
        &self,
        channel_x: &str,
        channel_y: &str,
        voltage_range_v: f64,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.started {
            bail!("MockGalvoPair: cannot reconfigure while started");
        }
        debug!(channel_x, channel_y, voltage_range_v, "mock galvo configured");
        state.channels = Some((channel_x.to_string(), channel_y.to_string()));
        state.voltage_range_v = voltage_range_v;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.channels.is_none() {
            bail!("MockGalvoPair: start before configure");
        }
        state.started = true;
        Ok(())
    }

    async fn write_pair(&self, voltage_x: f64, voltage_y: f64) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.started {
            bail!("MockGalvoPair: write before start");
        }
        if self.fail_on_write == Some(state.writes.len()) {
            bail!(
                "MockGalvoPair: injected write failure at sample {}",
                state.writes.len()
            );
        }
        state.writes.push((voltage_x, voltage_y));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.started = false;
        state.stop_count += 1;
        Ok(())
    }
}

/// Simulated detector producing uniform pseudo-random intensities.
///
/// Owns its RNG state; seedable for deterministic tests.
pub struct SimulatedDetector {
    range: RangeInclusive<u8>,
    rng: Mutex<StdRng>,
}

impl SimulatedDetector {
    /// Create a detector sampling uniformly from `range`.
    pub fn new(range: RangeInclusive<u8>) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a deterministic detector for tests and reproducible demo runs.
    pub fn with_seed(range: RangeInclusive<u8>, seed: u64) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl IntensitySource for SimulatedDetector {
    async fn sample(&self) -> Result<u8> {
        let mut rng = self.rng.lock().await;
        Ok(rng.gen_range(self.range.clone()))
    }
}
