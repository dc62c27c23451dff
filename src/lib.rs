//! # DrishtiMap
//!
//! Probabilistic 3D occupancy mapping for distributed-particle stereo SLAM.
//!
//! ## Overview
//!
//! DrishtiMap maintains a **multi-hypothesis voxel grid**: every stereo
//! range measurement enters the map as tentative evidence tagged by the
//! particle pose that produced it, and occupancy queries project the
//! accumulated evidence through an arbitrary pose's ancestry. Each
//! particle therefore sees exactly the map its own trajectory built,
//! while all particles share one grid.
//!
//! The three load-bearing pieces:
//!
//! - **Per-pose hypothesis streams** ([`VoxelGrid`], [`Cell`],
//!   [`Hypothesis`]): voxel columns accumulate pose-tagged observations;
//!   queries replay an ancestry's contributions with a temporal gate so a
//!   pose never reinforces itself with rays it just deposited.
//! - **Sensor-model ray casting** ([`EvidenceRay`],
//!   [`SensorModelLookup`], [`VoxelGrid::integrate_ray`]): one occupied
//!   and two vacancy traversals with a diamond cross-section and Gaussian
//!   lateral falloff, computing the map update and a localisation match
//!   score in a single pass.
//! - **Deferred reclamation** ([`VoxelGrid::remove`],
//!   [`VoxelGrid::garbage_collect`]): dropping a pose tombstones its
//!   evidence in O(1) per hypothesis; a bounded sweeper compacts later
//!   without perturbing readers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use drishti_map::{
//!     EvidenceRay, PoseTable, SensorModelLookup, VoxelGrid, VoxelGridConfig, WorldPoint3,
//! };
//!
//! let mut grid = VoxelGrid::new(VoxelGridConfig::default())?;
//! let mut poses = PoseTable::new();
//! let pose = poses.insert_root(0);
//!
//! // One stereo measurement under one particle pose.
//! let score = grid.integrate_ray(&ray, pose, &lookup, &left_cam, &right_cam, &mut poses);
//!
//! // Resampling dropped the pose: retract and reclaim.
//! let dropped = poses.remove(pose).unwrap();
//! grid.retract_pose(&dropped);
//! grid.garbage_collect(100);
//! ```
//!
//! ## Coordinate System
//!
//! World coordinates are millimetres. The grid footprint is a fixed
//! `width × width` array of columns centred on the configured world
//! position; columns run upward from the configured Z. The grid never
//! resizes.
//!
//! ## Concurrency
//!
//! Single-writer by contract: the owning filter serialises ray insertions
//! and pose retraction against each other. Nothing here blocks or
//! suspends.

#![warn(missing_docs)]

pub mod core;
pub mod grid;
pub mod particle;
pub mod sensor;

pub use crate::core::math;
pub use crate::core::{VoxelCoord, WorldPoint3};

pub use grid::{
    Cell, ConfigError, Hypothesis, HypothesisArena, HypothesisId, VoxelGrid, VoxelGridConfig,
};

pub use particle::{ParticlePose, PathIndex, PoseId, PoseTable};

pub use sensor::{EvidenceRay, SensorModelLookup};
