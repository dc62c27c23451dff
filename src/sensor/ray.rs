//! Stereo evidence ray.

use serde::{Deserialize, Serialize};

use crate::core::WorldPoint3;

/// A single piece of stereo range evidence.
///
/// The ray has an occupied foreground segment between `vertices[0]` (near
/// edge) and `vertices[1]` (far edge), and two vacancy regions from each
/// camera up to the junction point inside the occupied segment. The
/// cross-section is a diamond: zero width at both ends, widest at
/// `fattest_point`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRay {
    /// Near and far edges of the occupied region (world mm).
    pub vertices: [WorldPoint3; 2],
    /// Camera baseline midpoint the measurement was observed from (world mm).
    pub observed_from: WorldPoint3,
    /// Cross-section width of the occupied region (mm).
    pub width_mm: f32,
    /// Length of the occupied region (mm).
    pub length_mm: f32,
    /// Stereo pixel disparity of the match (proxy for inverse depth).
    pub disparity: f32,
    /// Fractional position along the occupied region where the diamond
    /// cross-section peaks, in [0, 1].
    pub fattest_point: f32,
}

impl EvidenceRay {
    /// Create a ray, deriving `length_mm` from the vertices.
    pub fn new(
        near: WorldPoint3,
        far: WorldPoint3,
        observed_from: WorldPoint3,
        width_mm: f32,
        disparity: f32,
        fattest_point: f32,
    ) -> Self {
        Self {
            vertices: [near, far],
            observed_from,
            width_mm,
            length_mm: near.distance(&far),
            disparity,
            fattest_point,
        }
    }

    /// Junction point between the occupied region and the vacancy cones.
    ///
    /// Each component interpolates along its own axis.
    #[inline]
    pub fn intersect(&self) -> WorldPoint3 {
        self.vertices[0].lerp(&self.vertices[1], self.fattest_point)
    }
}
