//! Hypothesis storage.
//!
//! A hypothesis must be reachable both from its voxel's slot list (for
//! probability queries) and from the pose that wrote it (for retraction on
//! resampling). Both sides hold [`SlotMap`] keys into a shared arena, which
//! sidesteps reference cycles and makes retraction a single store. Keys are
//! versioned, so a key whose slot has been swept and reused resolves to
//! `None` instead of aliasing the new occupant.

use slotmap::{new_key_type, SlotMap};

use crate::particle::PoseId;

new_key_type! {
    /// Key type for accessing hypotheses in the shared [`SlotMap`] arena.
    ///
    /// Cells and poses both store these keys instead of owning the
    /// hypothesis, so the two reference paths never form a cycle.
    pub struct HypothesisId;
}

/// Shared hypothesis arena keyed by [`HypothesisId`].
///
/// Slots are removed only at sweep time, once neither the cell list nor
/// any live pose references them.
pub type HypothesisArena = SlotMap<HypothesisId, Hypothesis>;

/// A single probabilistic observation of one voxel.
///
/// Immutable after creation except for `enabled`, which flips to `false`
/// when the owning pose retracts it. Disabled hypotheses are inert to
/// queries and pending physical removal by the sweeper.
#[derive(Debug, Clone, Copy)]
pub struct Hypothesis {
    /// Voxel column X.
    pub x: i32,
    /// Voxel column Y.
    pub y: i32,
    /// Vertical slot.
    pub z: i32,
    /// Log-odds occupancy contribution.
    pub log_odds: f32,
    /// Pose that deposited this observation.
    pub pose: PoseId,
    /// In-band tombstone: `false` means retracted, awaiting sweep.
    pub enabled: bool,
}
