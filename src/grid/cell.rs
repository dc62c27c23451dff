//! Per-column voxel storage.
//!
//! A cell is the vertical column at one `(x, y)` footprint position. Each
//! vertical slot holds the hypotheses deposited at that voxel, as handles
//! into the shared arena. Writers only append; retraction tombstones
//! in place and the sweeper compacts later, so query traversals running
//! between the two see a stable view.

use crate::core::math;
use crate::particle::{PoseId, PoseTable};

use super::hypothesis::{HypothesisArena, HypothesisId};

/// Hypothesis list for one vertical slot.
#[derive(Debug, Default)]
struct SlotList {
    entries: Vec<HypothesisId>,
    /// Set on tombstone, cleared by [`Cell::collect`].
    dirty: bool,
}

/// One occupied `(x, y)` column of the grid.
#[derive(Debug)]
pub struct Cell {
    slots: Vec<Option<SlotList>>,
    /// Disabled hypotheses resident in this column, not yet swept.
    garbage_entries: usize,
}

impl Cell {
    /// Create an empty column of `height` slots.
    pub(crate) fn new(height: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(height).collect(),
            garbage_entries: 0,
        }
    }

    /// Append a hypothesis handle at slot `z`, creating the list if absent.
    pub(crate) fn add(&mut self, z: i32, id: HypothesisId) {
        if let Some(slot) = self.slots.get_mut(z as usize) {
            slot.get_or_insert_with(SlotList::default).entries.push(id);
        }
    }

    /// True if slot `z` currently holds any hypotheses.
    #[inline]
    pub fn has_evidence(&self, z: i32) -> bool {
        matches!(self.slots.get(z as usize), Some(Some(_)))
    }

    /// Disabled hypotheses resident in this column.
    #[inline]
    pub fn garbage_entries(&self) -> usize {
        self.garbage_entries
    }

    /// All resident hypothesis handles, bottom slot first.
    pub fn hypotheses(&self) -> impl Iterator<Item = HypothesisId> + '_ {
        self.slots
            .iter()
            .flatten()
            .flat_map(|slot| slot.entries.iter().copied())
    }

    /// Occupancy evidence for one voxel, conditioned on a pose's ancestry.
    ///
    /// Replays the contributions of each ancestor path at `(x, y, z)`,
    /// summing enabled hypotheses in log-odds. The temporal gate skips
    /// paths written at or after the querying pose's own time step, so a
    /// pose never reinforces itself with rays it just deposited. Returns
    /// `None` when nothing contributes.
    pub fn probability_at(
        &self,
        pose: PoseId,
        poses: &PoseTable,
        arena: &HypothesisArena,
        x: i32,
        y: i32,
        z: i32,
        as_log_odds: bool,
    ) -> Option<f32> {
        if !self.has_evidence(z) {
            return None;
        }
        let querier = poses.get(pose)?;

        let mut sum = 0.0f32;
        let mut hits = 0usize;
        for &ancestor_id in querier.ancestry() {
            let Some(ancestor) = poses.get(ancestor_id) else {
                continue;
            };
            // All hypotheses in a path share their writer's time step.
            if querier.time_step() <= ancestor.time_step() {
                continue;
            }
            for &id in ancestor.written().at(x, y, z) {
                if let Some(h) = arena.get(id) {
                    if h.enabled {
                        sum += h.log_odds;
                        hits += 1;
                    }
                }
            }
        }

        if hits == 0 {
            None
        } else if as_log_odds {
            Some(sum)
        } else {
            Some(math::probability(sum))
        }
    }

    /// Column occupancy for a pose: per-slot log-odds summed over every
    /// slot with evidence, converted once at the end.
    ///
    /// Treats vertical observations as independent log-odds contributions.
    /// With no contributing ancestry this is exactly 0.5.
    pub fn probability(
        &self,
        pose: PoseId,
        poses: &PoseTable,
        arena: &HypothesisArena,
        x: i32,
        y: i32,
    ) -> f32 {
        let mut sum = 0.0f32;
        for z in 0..self.slots.len() as i32 {
            if let Some(l) = self.probability_at(pose, poses, arena, x, y, z, true) {
                sum += l;
            }
        }
        math::probability(sum)
    }

    /// Mark slot `z` dirty after a tombstone.
    ///
    /// Returns true when this was the column's first pending garbage entry,
    /// which is the caller's cue to enqueue the cell exactly once.
    pub(crate) fn mark_garbage(&mut self, z: i32) -> bool {
        if let Some(slot) = self.slots.get_mut(z as usize).and_then(Option::as_mut) {
            slot.dirty = true;
        }
        let first = self.garbage_entries == 0;
        self.garbage_entries += 1;
        first
    }

    /// Sweep slot `z`, removing tombstoned hypotheses tail-first.
    ///
    /// Stops as soon as the column has no garbage left. An emptied slot
    /// releases its list. Returns the number of entries removed.
    pub(crate) fn collect(&mut self, z: i32, arena: &mut HypothesisArena) -> usize {
        let Some(slot_opt) = self.slots.get_mut(z as usize) else {
            return 0;
        };
        let Some(slot) = slot_opt.as_mut() else {
            return 0;
        };

        let mut removed = 0;
        let mut i = slot.entries.len();
        while i > 0 && self.garbage_entries > 0 {
            i -= 1;
            let id = slot.entries[i];
            let dead = arena.get(id).map_or(true, |h| !h.enabled);
            if dead {
                slot.entries.swap_remove(i);
                arena.remove(id);
                self.garbage_entries -= 1;
                removed += 1;
            }
        }
        slot.dirty = false;
        if slot.entries.is_empty() {
            *slot_opt = None;
        }
        removed
    }

    /// Sweep every dirty slot; short-circuits once the column is clean.
    pub(crate) fn collect_all(&mut self, arena: &mut HypothesisArena) -> usize {
        let mut removed = 0;
        for z in 0..self.slots.len() {
            if self.garbage_entries == 0 {
                break;
            }
            let dirty = self.slots[z].as_ref().map_or(false, |s| s.dirty);
            if dirty {
                removed += self.collect(z as i32, arena);
            }
        }
        removed
    }
}
