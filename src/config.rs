//! Typed configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. A TOML file (default `config/galvo.toml`)
//! 2. Environment variables prefixed with `GALVO_SCAN_`, with a double
//!    underscore separating section from key (field names themselves
//!    contain single underscores), e.g. `GALVO_SCAN_DEVICE__VOLTAGE_RANGE_V`
//!
//! Every tunable named by the scan pipeline lives here rather than as a
//! literal in the loop: device channel identifiers, voltage and angular
//! ranges, step size, settle duration, the simulated-intensity range, the
//! buffer extent and the display/viewport increments.
//!
//! # Example
//! ```no_run
//! use galvo_scan::config::Settings;
//!
//! let settings = Settings::load_from("config/galvo.toml")?;
//! println!("Scanning on {} / {}", settings.device.channel_x, settings.device.channel_y);
//! # Ok::<(), figment::Error>(())
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Analog-output device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Optical geometry of the galvo pair
    #[serde(default)]
    pub optics: OpticsConfig,
    /// Scan loop timing
    #[serde(default)]
    pub scan: ScanConfig,
    /// Detector input settings
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Heatmap display and viewport settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Analog-output device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// X-axis analog output channel identifier
    #[serde(default = "default_channel_x")]
    pub channel_x: String,
    /// Y-axis analog output channel identifier
    #[serde(default = "default_channel_y")]
    pub channel_y: String,
    /// Symmetric output range in volts (channels accept ±this value)
    #[serde(default = "default_voltage_range")]
    pub voltage_range_v: f64,
    /// Timeout for a single synchronous sample-pair write
    #[serde(default = "default_write_timeout", with = "humantime_serde")]
    pub write_timeout: Duration,
}

/// Optical geometry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpticsConfig {
    /// Full mechanical deflection range in degrees (±this value)
    #[serde(default = "default_angle_range")]
    pub angle_range_deg: f64,
    /// Angular step per grid index, in degrees
    #[serde(default = "default_step_size")]
    pub step_size_deg: f64,
}

/// Scan loop timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Settle delay after each output command, before the next point.
    ///
    /// Trade-off between scan speed and deflection fidelity.
    #[serde(default = "default_settle", with = "humantime_serde")]
    pub settle: Duration,
}

/// Detector input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Lower bound of the simulated intensity range
    #[serde(default = "default_sim_min")]
    pub sim_min: u8,
    /// Upper bound of the simulated intensity range
    #[serde(default = "default_sim_max")]
    pub sim_max: u8,
}

/// Heatmap display and viewport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Intensity buffer extent (buffer is `buffer_size × buffer_size` cells)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Display window extent in pixels (window is `window_size × window_size`)
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Multiplier applied per zoom-in / divided per zoom-out command
    #[serde(default = "default_zoom_factor")]
    pub zoom_factor: f64,
    /// Offset change per pan command, in scaled pixels
    #[serde(default = "default_pan_step")]
    pub pan_step: usize,
    /// Initial zoom level for the live preview
    #[serde(default = "default_initial_scale")]
    pub initial_scale: f64,
    /// Refresh cadence of the passive viewer phase
    #[serde(default = "default_viewer_refresh", with = "humantime_serde")]
    pub viewer_refresh: Duration,
}

// Default value functions (values from the reference galvo bench setup)

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_x() -> String {
    "Dev1/ao0".to_string()
}

fn default_channel_y() -> String {
    "Dev1/ao1".to_string()
}

fn default_voltage_range() -> f64 {
    5.0
}

fn default_write_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_angle_range() -> f64 {
    22.5
}

fn default_step_size() -> f64 {
    0.01
}

fn default_settle() -> Duration {
    Duration::from_micros(200)
}

fn default_sim_min() -> u8 {
    10
}

fn default_sim_max() -> u8 {
    255
}

fn default_buffer_size() -> usize {
    200
}

fn default_window_size() -> usize {
    800
}

fn default_zoom_factor() -> f64 {
    1.25
}

fn default_pan_step() -> usize {
    20
}

fn default_initial_scale() -> f64 {
    4.0
}

fn default_viewer_refresh() -> Duration {
    Duration::from_millis(30)
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            channel_x: default_channel_x(),
            channel_y: default_channel_y(),
            voltage_range_v: default_voltage_range(),
            write_timeout: default_write_timeout(),
        }
    }
}

impl Default for OpticsConfig {
    fn default() -> Self {
        Self {
            angle_range_deg: default_angle_range(),
            step_size_deg: default_step_size(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            settle: default_settle(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sim_min: default_sim_min(),
            sim_max: default_sim_max(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            window_size: default_window_size(),
            zoom_factor: default_zoom_factor(),
            pan_step: default_pan_step(),
            initial_scale: default_initial_scale(),
            viewer_refresh: default_viewer_refresh(),
        }
    }
}

impl Settings {
    /// Load configuration from the default file and environment variables.
    ///
    /// Environment variables override file values with the `GALVO_SCAN_`
    /// prefix and `__` between section and key, e.g.
    /// `GALVO_SCAN_DEVICE__VOLTAGE_RANGE_V=2.5`.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("config/galvo.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        // Split on a double underscore: field names carry single
        // underscores, so a single-underscore split would shatter them
        // into keys serde silently drops.
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("GALVO_SCAN_").split("__"))
            .extract()
    }

    /// Validate configuration after loading.
    ///
    /// Catches values that parse fine but are logically invalid. A zero
    /// angular range in particular must be rejected here: the coordinate
    /// transform divides by it and treats it as a startup-checked constant.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if !(self.device.voltage_range_v > 0.0) {
            return Err(format!(
                "Invalid voltage_range_v {}. Must be positive",
                self.device.voltage_range_v
            ));
        }

        if self.optics.angle_range_deg == 0.0 || !self.optics.angle_range_deg.is_finite() {
            return Err(format!(
                "Invalid angle_range_deg {}. Must be finite and non-zero",
                self.optics.angle_range_deg
            ));
        }

        if !self.optics.step_size_deg.is_finite() {
            return Err(format!(
                "Invalid step_size_deg {}. Must be finite",
                self.optics.step_size_deg
            ));
        }

        if self.detector.sim_min > self.detector.sim_max {
            return Err(format!(
                "Invalid simulated intensity range [{}, {}]. Lower bound exceeds upper",
                self.detector.sim_min, self.detector.sim_max
            ));
        }

        if self.display.buffer_size == 0 {
            return Err("Invalid buffer_size 0. Buffer must have at least one cell".to_string());
        }

        if self.display.window_size == 0 {
            return Err("Invalid window_size 0. Display window must be non-empty".to_string());
        }

        if !(self.display.zoom_factor > 1.0) {
            return Err(format!(
                "Invalid zoom_factor {}. Must be greater than 1.0",
                self.display.zoom_factor
            ));
        }

        if !(self.display.initial_scale >= 1.0) {
            return Err(format!(
                "Invalid initial_scale {}. Must be at least 1.0",
                self.display.initial_scale
            ));
        }

        Ok(())
    }
}
