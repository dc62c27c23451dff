//! Multi-hypothesis voxel grid.
//!
//! Each occupied `(x, y)` footprint position holds a [`Cell`] column whose
//! slots accumulate tentative observations ([`Hypothesis`]) tagged by the
//! particle pose that wrote them. Probability queries project the
//! accumulated multiset through the ancestry of an arbitrary pose, so
//! sibling particles never pollute each other's view of the map.
//!
//! Retraction is two-phase: [`VoxelGrid::remove`] tombstones in O(1)
//! without disturbing concurrent query traversals, and
//! [`VoxelGrid::garbage_collect`] physically compacts tombstoned entries
//! with bounded work per call.

mod cell;
mod config;
mod export;
mod hypothesis;
mod raycaster;

pub use cell::Cell;
pub use config::{ConfigError, VoxelGridConfig};
pub use hypothesis::{Hypothesis, HypothesisArena, HypothesisId};

use log::debug;

use crate::core::math::{self, GAUSSIAN_SAMPLES};
use crate::core::{VoxelCoord, WorldPoint3};
use crate::particle::{ParticlePose, PoseId, PoseTable};

/// Fixed-size probabilistic 3D occupancy map with per-pose hypothesis
/// streams.
#[derive(Debug)]
pub struct VoxelGrid {
    config: VoxelGridConfig,

    /// Lazily created columns, row-major: index = y * width + x.
    cells: Vec<Option<Cell>>,

    /// Shared hypothesis storage referenced by cells and poses.
    hypotheses: HypothesisArena,

    /// Cells currently holding tombstoned entries, each listed once.
    garbage_cells: Vec<usize>,

    /// Enabled hypotheses across all cells.
    total_valid: usize,

    /// Tombstoned hypotheses still resident.
    total_garbage: usize,

    /// Lateral attenuation half-profile.
    gaussian: [f32; GAUSSIAN_SAMPLES],

    localisation_search_cells: i32,
    max_mapping_range_cells: f32,

    /// World position of voxel (0, 0, 0)'s low corner.
    origin: WorldPoint3,
}

impl VoxelGrid {
    /// Create an empty grid.
    ///
    /// Fails on a non-positive cell size or zero dimensions.
    pub fn new(config: VoxelGridConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let half_footprint = config.width as f32 * config.cell_size_mm / 2.0;
        let origin = WorldPoint3::new(
            config.centre.x - half_footprint,
            config.centre.y - half_footprint,
            config.centre.z,
        );

        Ok(Self {
            cells: std::iter::repeat_with(|| None)
                .take(config.width * config.width)
                .collect(),
            hypotheses: HypothesisArena::default(),
            garbage_cells: Vec::new(),
            total_valid: 0,
            total_garbage: 0,
            gaussian: math::gaussian_half_profile(),
            localisation_search_cells: config.localisation_search_cells(),
            max_mapping_range_cells: config.max_mapping_range_cells(),
            origin,
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &VoxelGridConfig {
        &self.config
    }

    /// Horizontal extent in cells (both X and Y).
    #[inline]
    pub fn width(&self) -> usize {
        self.config.width
    }

    /// Vertical extent in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.config.height
    }

    /// Cell edge length in millimetres.
    #[inline]
    pub fn cell_size_mm(&self) -> f32 {
        self.config.cell_size_mm
    }

    /// Lateral localisation search radius in cells.
    #[inline]
    pub fn localisation_search_cells(&self) -> i32 {
        self.localisation_search_cells
    }

    /// Enabled hypotheses across all cells.
    #[inline]
    pub fn total_valid_hypotheses(&self) -> usize {
        self.total_valid
    }

    /// Tombstoned hypotheses still awaiting the sweeper.
    #[inline]
    pub fn total_garbage_hypotheses(&self) -> usize {
        self.total_garbage
    }

    /// Cells currently on the sweep worklist.
    #[inline]
    pub fn pending_garbage_cells(&self) -> usize {
        self.garbage_cells.len()
    }

    /// Look up a hypothesis by handle.
    #[inline]
    pub fn hypothesis(&self, id: HypothesisId) -> Option<&Hypothesis> {
        self.hypotheses.get(id)
    }

    /// Shared hypothesis storage, for use with [`Cell`]-level queries.
    #[inline]
    pub fn hypotheses(&self) -> &HypothesisArena {
        &self.hypotheses
    }

    // === Coordinates ===

    /// Convert world millimetres to voxel indices.
    ///
    /// The result may lie outside the grid; see [`VoxelGrid::in_bounds`].
    #[inline]
    pub fn world_to_voxel(&self, p: &WorldPoint3) -> VoxelCoord {
        let cell = self.config.cell_size_mm;
        VoxelCoord::new(
            ((p.x - self.origin.x) / cell).floor() as i32,
            ((p.y - self.origin.y) / cell).floor() as i32,
            ((p.z - self.origin.z) / cell).floor() as i32,
        )
    }

    /// Convert voxel indices to the world position of the voxel centre.
    #[inline]
    pub fn voxel_to_world(&self, v: VoxelCoord) -> WorldPoint3 {
        let cell = self.config.cell_size_mm;
        WorldPoint3::new(
            self.origin.x + (v.x as f32 + 0.5) * cell,
            self.origin.y + (v.y as f32 + 0.5) * cell,
            self.origin.z + (v.z as f32 + 0.5) * cell,
        )
    }

    /// Check voxel indices against the grid extents.
    #[inline]
    pub fn in_bounds(&self, v: VoxelCoord) -> bool {
        v.x >= 0
            && v.y >= 0
            && v.z >= 0
            && (v.x as usize) < self.config.width
            && (v.y as usize) < self.config.width
            && (v.z as usize) < self.config.height
    }

    #[inline]
    fn cell_index(&self, x: i32, y: i32) -> usize {
        y as usize * self.config.width + x as usize
    }

    /// The column at `(x, y)`, if any ray has touched it.
    #[inline]
    pub fn cell_at(&self, x: i32, y: i32) -> Option<&Cell> {
        if x < 0 || y < 0 || x as usize >= self.config.width || y as usize >= self.config.width {
            return None;
        }
        self.cells[self.cell_index(x, y)].as_ref()
    }

    /// The column at `(x, y)`, created on first write.
    pub(crate) fn cell_mut_or_create(&mut self, x: i32, y: i32) -> &mut Cell {
        let idx = self.cell_index(x, y);
        let height = self.config.height;
        self.cells[idx].get_or_insert_with(|| Cell::new(height))
    }

    // === Queries ===

    /// Pose-conditioned occupancy at one voxel.
    ///
    /// `None` means no evidence contributes under this pose's ancestry.
    pub fn probability_at(
        &self,
        pose: PoseId,
        poses: &PoseTable,
        v: VoxelCoord,
        as_log_odds: bool,
    ) -> Option<f32> {
        self.cell_at(v.x, v.y)?
            .probability_at(pose, poses, &self.hypotheses, v.x, v.y, v.z, as_log_odds)
    }

    /// Pose-conditioned occupancy of a whole column, 0.5 baseline.
    pub fn column_probability(&self, pose: PoseId, poses: &PoseTable, x: i32, y: i32) -> f32 {
        match self.cell_at(x, y) {
            Some(cell) => cell.probability(pose, poses, &self.hypotheses, x, y),
            None => 0.5,
        }
    }

    // === Reclamation ===

    /// Tombstone a hypothesis.
    ///
    /// O(1): flips the enabled flag, dirties the slot, and enqueues the
    /// cell for sweeping if it was clean. Queries observe the hypothesis
    /// as absent from this point on. Removing an already-retracted
    /// hypothesis is a no-op.
    pub fn remove(&mut self, id: HypothesisId) {
        let (x, y, z) = match self.hypotheses.get_mut(id) {
            Some(h) if h.enabled => {
                h.enabled = false;
                (h.x, h.y, h.z)
            }
            _ => return,
        };

        let idx = self.cell_index(x, y);
        if let Some(cell) = self.cells[idx].as_mut() {
            if cell.mark_garbage(z) {
                self.garbage_cells.push(idx);
            }
        }
        self.total_garbage += 1;
        self.total_valid -= 1;
    }

    /// Tombstone every hypothesis a pose deposited.
    ///
    /// Call with the pose handed back by `PoseTable::remove` when the
    /// filter drops it during resampling.
    pub fn retract_pose(&mut self, pose: &ParticlePose) {
        for id in pose.written().ids() {
            self.remove(id);
        }
    }

    /// Sweep tombstoned hypotheses, bounded by `budget_percent`.
    ///
    /// Walks the worklist tail-to-head, sweeping at most
    /// `max(1, pending * budget_percent / 100)` cells per call; a swept
    /// cell is fully compacted and leaves the worklist. Purely a memory
    /// operation: queries are unaffected. Returns the number of entries
    /// reclaimed.
    pub fn garbage_collect(&mut self, budget_percent: u32) -> usize {
        let pending = self.garbage_cells.len();
        if pending == 0 {
            return 0;
        }
        let budget = (budget_percent.min(100) as usize * pending / 100).max(1);

        let mut swept = 0;
        let mut removed = 0;
        let mut i = self.garbage_cells.len();
        while i > 0 && swept < budget {
            i -= 1;
            let idx = self.garbage_cells[i];
            let clean = match self.cells[idx].as_mut() {
                Some(cell) => {
                    removed += cell.collect_all(&mut self.hypotheses);
                    cell.garbage_entries() == 0
                }
                None => true,
            };
            if clean {
                self.garbage_cells.swap_remove(i);
            }
            swept += 1;
        }

        self.total_garbage -= removed;
        debug!(
            "garbage_collect: swept {} cells, reclaimed {} entries, {} cells pending",
            swept,
            removed,
            self.garbage_cells.len()
        );
        removed
    }

    pub(crate) fn record_insert(
        &mut self,
        h: Hypothesis,
        poses: &mut PoseTable,
    ) -> Option<HypothesisId> {
        let (x, y, z, pose) = (h.x, h.y, h.z, h.pose);
        let owner = poses.get_mut(pose)?;
        let id = self.hypotheses.insert(h);
        owner.add_hypothesis(x, y, z, id);
        self.cell_mut_or_create(x, y).add(z, id);
        self.total_valid += 1;
        Some(id)
    }
}
