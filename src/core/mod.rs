//! Core types for the DrishtiMap library.
//!
//! - [`WorldPoint3`]: floating-point world coordinates in millimetres
//! - [`VoxelCoord`]: integer cell indices for grid access
//! - [`math`]: log-odds conversions and the lateral Gaussian profile

pub mod math;
mod point;

pub use point::{VoxelCoord, WorldPoint3};
