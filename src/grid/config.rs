//! Configuration for the voxel grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::WorldPoint3;

/// Voxel grid configuration.
///
/// The grid footprint is a fixed `width × width` column array; each column
/// holds `height` vertical slots. Sizes never change after construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoxelGridConfig {
    /// Horizontal extent in cells (both X and Y).
    #[serde(default = "default_width")]
    pub width: usize,

    /// Vertical extent in cells.
    #[serde(default = "default_height")]
    pub height: usize,

    /// Cell edge length (mm).
    #[serde(default = "default_cell_size")]
    pub cell_size_mm: f32,

    /// Lateral search radius for the localisation match score (mm).
    #[serde(default = "default_localisation_radius")]
    pub localisation_radius_mm: f32,

    /// Beyond this range from the camera, rays still score against the map
    /// but deposit no new hypotheses (mm).
    #[serde(default = "default_max_mapping_range")]
    pub max_mapping_range_mm: f32,

    /// World position of the grid: centre of the footprint in X/Y,
    /// bottom of the column in Z (mm).
    #[serde(default)]
    pub centre: WorldPoint3,
}

fn default_width() -> usize {
    256
}
fn default_height() -> usize {
    64
}
fn default_cell_size() -> f32 {
    50.0 // 5cm voxels
}
fn default_localisation_radius() -> f32 {
    100.0
}
fn default_max_mapping_range() -> f32 {
    10_000.0 // 10m
}

impl Default for VoxelGridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            cell_size_mm: default_cell_size(),
            localisation_radius_mm: default_localisation_radius(),
            max_mapping_range_mm: default_max_mapping_range(),
            centre: WorldPoint3::default(),
        }
    }
}

impl VoxelGridConfig {
    /// Localisation search radius in whole cells.
    pub fn localisation_search_cells(&self) -> i32 {
        (self.localisation_radius_mm / self.cell_size_mm) as i32
    }

    /// Maximum mapping range in cells.
    pub fn max_mapping_range_cells(&self) -> f32 {
        self.max_mapping_range_mm / self.cell_size_mm
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size_mm > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size_mm));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Grid construction error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Cell size must be a positive length.
    #[error("cell size must be positive, got {0} mm")]
    InvalidCellSize(f32),

    /// Both grid dimensions must be non-zero.
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions {
        /// Configured horizontal extent.
        width: usize,
        /// Configured vertical extent.
        height: usize,
    },
}
