//! Particle pose bookkeeping consumed by the voxel grid.
//!
//! The particle filter itself (proposal, weighting, resampling) lives
//! outside this crate. What the grid needs from it is narrow:
//!
//! - each pose carries a `time_step` and the ordered ancestry of poses whose
//!   map contributions it inherits (ending with itself),
//! - each pose owns the write set of hypotheses it deposited, indexed by
//!   voxel so probability queries can replay exactly its own contributions,
//! - dropping a pose on resampling hands its write set back to the grid for
//!   retraction.
//!
//! Poses live in a [`SlotMap`] keyed by [`PoseId`] so the grid, the
//! hypothesis arena, and the filter can all refer to a pose without
//! reference cycles; keys of dropped poses resolve to `None` rather than
//! aliasing a recycled slot.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use crate::grid::HypothesisId;

new_key_type! {
    /// Key type for accessing poses in a [`PoseTable`].
    pub struct PoseId;
}

/// Per-pose write set: every hypothesis this pose deposited, indexed by
/// voxel coordinate.
///
/// Queries replay a path's own contributions at one voxel via
/// [`PathIndex::at`]; retraction walks the whole set via [`PathIndex::ids`].
#[derive(Debug, Default, Clone)]
pub struct PathIndex {
    by_voxel: HashMap<u64, Vec<HypothesisId>>,
    len: usize,
}

impl PathIndex {
    // 20 bits per axis; grid dimensions are far below this.
    #[inline]
    fn key(x: i32, y: i32, z: i32) -> u64 {
        ((x as u64) << 40) | ((y as u64) << 20) | z as u64
    }

    /// Record a hypothesis written at `(x, y, z)`.
    pub fn add(&mut self, x: i32, y: i32, z: i32, id: HypothesisId) {
        self.by_voxel.entry(Self::key(x, y, z)).or_default().push(id);
        self.len += 1;
    }

    /// Hypotheses this pose wrote at one voxel.
    #[inline]
    pub fn at(&self, x: i32, y: i32, z: i32) -> &[HypothesisId] {
        self.by_voxel
            .get(&Self::key(x, y, z))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All hypotheses in the write set, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = HypothesisId> + '_ {
        self.by_voxel.values().flatten().copied()
    }

    /// Total hypotheses recorded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the pose has written nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A particle pose: one hypothesis of the robot trajectory endpoint.
#[derive(Debug, Clone)]
pub struct ParticlePose {
    time_step: u32,
    ancestry: Vec<PoseId>,
    written: PathIndex,
}

impl ParticlePose {
    /// Filter iteration this pose was created at.
    #[inline]
    pub fn time_step(&self) -> u32 {
        self.time_step
    }

    /// Ancestor chain whose map contributions this pose inherits,
    /// oldest first and ending with the pose itself.
    #[inline]
    pub fn ancestry(&self) -> &[PoseId] {
        &self.ancestry
    }

    /// This pose's own write set.
    #[inline]
    pub fn written(&self) -> &PathIndex {
        &self.written
    }

    /// Record ownership of a newly deposited hypothesis.
    #[inline]
    pub fn add_hypothesis(&mut self, x: i32, y: i32, z: i32, id: HypothesisId) {
        self.written.add(x, y, z, id);
    }
}

/// Table of live poses.
///
/// Slots of dropped poses are recycled internally, so long-running
/// filters do not grow the table with every resample.
#[derive(Debug, Default)]
pub struct PoseTable {
    poses: SlotMap<PoseId, ParticlePose>,
}

impl PoseTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pose with no ancestors (the root of a particle tree).
    pub fn insert_root(&mut self, time_step: u32) -> PoseId {
        self.poses.insert_with_key(|id| ParticlePose {
            time_step,
            ancestry: vec![id],
            written: PathIndex::default(),
        })
    }

    /// Spawn a child pose inheriting the parent's ancestry.
    ///
    /// The child consults every ancestor path (including its own) when
    /// querying the map.
    pub fn spawn_child(&mut self, parent: PoseId, time_step: u32) -> PoseId {
        let mut ancestry = self
            .get(parent)
            .map(|p| p.ancestry.clone())
            .unwrap_or_default();
        self.poses.insert_with_key(|id| {
            ancestry.push(id);
            ParticlePose {
                time_step,
                ancestry,
                written: PathIndex::default(),
            }
        })
    }

    /// Look up a pose.
    #[inline]
    pub fn get(&self, id: PoseId) -> Option<&ParticlePose> {
        self.poses.get(id)
    }

    /// Look up a pose mutably.
    #[inline]
    pub fn get_mut(&mut self, id: PoseId) -> Option<&mut ParticlePose> {
        self.poses.get_mut(id)
    }

    /// Drop a pose, returning it so the caller can retract its write set.
    pub fn remove(&mut self, id: PoseId) -> Option<ParticlePose> {
        self.poses.remove(id)
    }

    /// Number of live poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// True if no pose is live.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}
