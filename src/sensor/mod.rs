//! Sensor-facing input types.
//!
//! - [`EvidenceRay`]: a stereo range measurement as a 3D evidence segment
//! - [`SensorModelLookup`]: the pre-tabulated disparity/step evidence table

mod lookup;
mod ray;

pub use lookup::{SensorModelLookup, MIN_MODEL_ROW};
pub use ray::EvidenceRay;
