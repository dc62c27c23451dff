//! Display and extraction helpers for the voxel grid.
//!
//! Pure read-side views: nothing here feeds back into grid state.

use crate::core::VoxelCoord;
use crate::particle::{PoseId, PoseTable};

use super::VoxelGrid;

/// Never-observed column.
const SHADE_UNKNOWN: u8 = 255;
/// Column confidently occupied (p > 0.7).
const SHADE_OCCUPIED: u8 = 0;
/// Column leaning occupied (0.5 < p <= 0.7).
const SHADE_LIKELY: u8 = 100;
/// Column with weak or balanced evidence (0.3 <= p <= 0.5).
const SHADE_UNCERTAIN: u8 = 200;
/// Column confidently clear (p < 0.3).
const SHADE_CLEAR: u8 = 230;

fn shade(p: f32) -> u8 {
    if p > 0.7 {
        SHADE_OCCUPIED
    } else if p > 0.5 {
        SHADE_LIKELY
    } else if p >= 0.3 {
        SHADE_UNCERTAIN
    } else {
        SHADE_CLEAR
    }
}

impl VoxelGrid {
    /// Paint a pose-conditioned top-down view into an RGB byte buffer.
    ///
    /// Samples the footprint by nearest neighbour; each pixel is a grey
    /// triple. `buf` must hold at least `width_px * height_px * 3` bytes;
    /// smaller buffers are left untouched.
    pub fn probability_image(
        &self,
        pose: PoseId,
        poses: &PoseTable,
        buf: &mut [u8],
        width_px: usize,
        height_px: usize,
    ) {
        if width_px == 0 || height_px == 0 || buf.len() < width_px * height_px * 3 {
            return;
        }

        for py in 0..height_px {
            let cy = (py * self.width() / height_px) as i32;
            for px in 0..width_px {
                let cx = (px * self.width() / width_px) as i32;
                let value = match self.cell_at(cx, cy) {
                    None => SHADE_UNKNOWN,
                    Some(cell) => shade(cell.probability(pose, poses, self.hypotheses(), cx, cy)),
                };
                let at = (py * width_px + px) * 3;
                buf[at] = value;
                buf[at + 1] = value;
                buf[at + 2] = value;
            }
        }
    }

    /// Top-down grayscale rendition, one byte per footprint cell.
    ///
    /// Returns `(width, height, pixels)` in row-major order.
    pub fn to_grayscale(&self, pose: PoseId, poses: &PoseTable) -> (usize, usize, Vec<u8>) {
        let w = self.width();
        let mut pixels = Vec::with_capacity(w * w);
        for y in 0..w as i32 {
            for x in 0..w as i32 {
                let value = match self.cell_at(x, y) {
                    None => SHADE_UNKNOWN,
                    Some(cell) => shade(cell.probability(pose, poses, self.hypotheses(), x, y)),
                };
                pixels.push(value);
            }
        }
        (w, w, pixels)
    }

    /// Voxels whose pose-conditioned probability exceeds `threshold`.
    ///
    /// Useful for feeding obstacle extraction or scan matching downstream.
    pub fn occupied_voxels(
        &self,
        pose: PoseId,
        poses: &PoseTable,
        threshold: f32,
    ) -> Vec<VoxelCoord> {
        let mut voxels = Vec::new();
        for y in 0..self.width() as i32 {
            for x in 0..self.width() as i32 {
                let Some(cell) = self.cell_at(x, y) else {
                    continue;
                };
                for z in 0..self.height() as i32 {
                    if let Some(p) =
                        cell.probability_at(pose, poses, self.hypotheses(), x, y, z, false)
                    {
                        if p > threshold {
                            voxels.push(VoxelCoord::new(x, y, z));
                        }
                    }
                }
            }
        }
        voxels
    }

    /// Resident size of the column array in bytes.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of_val(self.cells.as_slice())
    }
}
