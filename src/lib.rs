//! Two-axis galvo scan controller with a live intensity heatmap.
//!
//! A scan run drives a pair of galvanometer mirrors through a precomputed
//! list of grid points, samples a detector at each position, and accumulates
//! the readings into a square intensity buffer that is rendered through a
//! zoomable, pannable viewport.
//!
//! Module map:
//!
//! - [`config`] — layered settings (file + environment) with validation
//! - [`error`] — the crate-wide error type and result alias
//! - [`transform`] — grid index → mirror angle → command voltage
//! - [`path`] — CSV point source loading and the precomputed scan path
//! - [`buffer`] — the square intensity accumulation grid
//! - [`hardware`] — device capability traits and mock implementations
//! - [`executor`] — the per-point scan loop with range and timeout guards
//! - [`viewport`] — zoom/pan state and the heatmap renderer
//! - [`display`] — channels between the scan task and the display surface
//! - [`app`] — the egui viewer window
//! - [`orchestrator`] — phase sequencing and device lifecycle

pub mod app;
pub mod buffer;
pub mod config;
pub mod display;
pub mod error;
pub mod executor;
pub mod hardware;
pub mod orchestrator;
pub mod path;
pub mod transform;
pub mod viewport;

pub use error::{ScanError, ScanResult};
