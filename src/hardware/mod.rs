//! Hardware ports: capability traits and mock implementations.

pub mod capabilities;
pub mod mock;

pub use capabilities::{AnalogOutput, IntensitySource};
pub use mock::{MockGalvoPair, SimulatedDetector};
