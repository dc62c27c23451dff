//! Evidence ray insertion.
//!
//! A stereo measurement enters the map as three traversals sharing one
//! diamond cross-section profile:
//!
//! ```text
//!                    occupied region
//! left cam ●─────╲    ╱▔▔▔▔▔╲
//!                 ╳──▶▏ hit  ▕──▶ far edge
//! right cam ●────╱    ╲▁▁▁▁▁╱
//!    vacancy cones    v0     v1
//! ```
//!
//! - OCCUPIED walks the hit region from near to far edge, depositing the
//!   tabulated sensor-model evidence.
//! - VACANT_LEFT / VACANT_RIGHT walk from each camera to the junction
//!   point inside the occupied region, depositing vacancy evidence. Their
//!   traversal stops one ray-width short so the cones never overwrite the
//!   hit region.
//!
//! The same traversal doubles as the localisation scorer: for OCCUPIED
//! steps, existing cells within the widened search band are compared
//! against the incoming evidence and the agreement accumulates into a
//! match score the filter uses to reweight the pose.

use log::trace;

use crate::core::{math, WorldPoint3};
use crate::particle::{PoseId, PoseTable};
use crate::sensor::{EvidenceRay, SensorModelLookup};

use super::hypothesis::Hypothesis;
use super::VoxelGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RayComponent {
    Occupied,
    VacantLeft,
    VacantRight,
}

impl VoxelGrid {
    /// Insert one evidence ray under a pose and score it against the map.
    ///
    /// Deposits hypotheses along all three components into both the grid
    /// and the pose's write set, and returns the accumulated localisation
    /// match score. A step leaving the mappable band aborts the remainder
    /// of the ray; the score gathered so far is returned.
    pub fn integrate_ray(
        &mut self,
        ray: &EvidenceRay,
        pose: PoseId,
        lookup: &SensorModelLookup,
        left_camera: &WorldPoint3,
        right_camera: &WorldPoint3,
        poses: &mut PoseTable,
    ) -> f64 {
        let (model_row, small_disparity) = lookup.model_row(ray.disparity);
        let intersect = ray.intersect();

        let mut score = 0.0f64;
        for component in [
            RayComponent::Occupied,
            RayComponent::VacantLeft,
            RayComponent::VacantRight,
        ] {
            let (start, end) = match component {
                RayComponent::Occupied => (ray.vertices[0], ray.vertices[1]),
                RayComponent::VacantLeft => (*left_camera, intersect),
                RayComponent::VacantRight => (*right_camera, intersect),
            };
            let completed = self.trace_component(
                component,
                start,
                end,
                ray,
                model_row,
                small_disparity,
                pose,
                lookup,
                poses,
                &mut score,
            );
            if !completed {
                break;
            }
        }
        score
    }

    /// Walk one component, updating cells and accumulating the score.
    ///
    /// Returns false when the traversal left the mappable band, which
    /// aborts the remaining components.
    #[allow(clippy::too_many_arguments)]
    fn trace_component(
        &mut self,
        component: RayComponent,
        start: WorldPoint3,
        end: WorldPoint3,
        ray: &EvidenceRay,
        model_row: usize,
        small_disparity: bool,
        pose: PoseId,
        lookup: &SensorModelLookup,
        poses: &mut PoseTable,
        score: &mut f64,
    ) -> bool {
        let cell_mm = self.config.cell_size_mm;
        let occupied = component == RayComponent::Occupied;

        let mut dx = end.x - start.x;
        let mut dy = end.y - start.y;
        let mut dz = end.z - start.z;

        // Vacancy cones stop one ray-width short of the occupied region.
        if !occupied {
            let len = (dx * dx + dy * dy + dz * dz).sqrt();
            if len <= ray.width_mm {
                return true;
            }
            let scale = (len - ray.width_mm) / len;
            dx *= scale;
            dy *= scale;
            dz *= scale;
        }

        let along_x = dx.abs() >= dy.abs();
        let steps = ((dx.abs().max(dy.abs()) / cell_mm) as i32).max(1);
        let steps_f = steps as f32;
        let step_x = dx / steps_f;
        let step_y = dy / steps_f;
        let step_z = dz / steps_f;

        // Distance from the camera to the front of the occupied region,
        // in cells, measured along the dominant axis.
        let starting_range = if occupied {
            let front = if along_x {
                (ray.vertices[0].x - ray.observed_from.x).abs()
            } else {
                (ray.vertices[0].y - ray.observed_from.y).abs()
            };
            front / cell_mm
        } else {
            0.0
        };

        let ray_width = (ray.width_mm / (2.0 * cell_mm)).round() as i32;
        // The diamond peaks at the fattest point of the occupied region;
        // vacancy cones widen monotonically toward the obstacle.
        let widest = if occupied {
            ray.fattest_point * steps_f
        } else {
            steps_f
        };

        let footprint = self.config.width as i32;
        let column = self.config.height as i32;

        let mut xx = start.x;
        let mut yy = start.y;
        let mut zz = start.z;
        let mut written = 0usize;

        for s in 0..steps {
            xx += step_x;
            yy += step_y;
            zz += step_z;

            let sf = s as f32;
            let mapping_width = if sf < widest {
                (sf * ray_width as f32 / widest) as i32
            } else if small_disparity {
                // One-pixel disparities have unbounded depth uncertainty:
                // the profile never tapers past the peak.
                ray_width
            } else {
                ((steps_f - sf + widest) * ray_width as f32 / (steps_f - widest)) as i32
            };
            let loc_width = mapping_width + self.localisation_search_cells;

            let v = self.world_to_voxel(&WorldPoint3::new(xx, yy, zz));
            if v.x < loc_width
                || v.x >= footprint - loc_width
                || v.y < loc_width
                || v.y >= footprint - loc_width
                || v.z < 0
                || v.z >= column
            {
                trace!(
                    "{:?}: left mappable band at step {}/{}, aborting ray",
                    component,
                    s,
                    steps
                );
                return false;
            }

            let within_mapping_range = sf + starting_range <= self.max_mapping_range_cells;

            let centre = if occupied {
                0.5 + lookup.value(model_row, s as usize) / 2.0
            } else {
                let t = sf / steps_f;
                let vacancy = 0.1 + 0.9 * (-t * t).exp();
                0.5 - vacancy / steps_f
            };

            // Lateral sweep runs perpendicular to the dominant axis.
            for w in -loc_width..=loc_width {
                let (x2, y2) = if along_x { (v.x, v.y + w) } else { (v.x + w, v.y) };
                let aw = w.abs();
                let inside_mapping = aw <= mapping_width;

                if occupied && self.cell_at(x2, y2).is_some() {
                    let prob_loc = if w != 0 {
                        centre * self.gaussian[((aw * 9 / loc_width) as usize).min(9)]
                    } else {
                        centre
                    };
                    *score += self.match_contribution(x2, y2, v.z, pose, prob_loc, poses);
                }

                if inside_mapping && within_mapping_range {
                    let prob = if w != 0 {
                        centre * self.gaussian[((aw * 9 / mapping_width) as usize).min(9)]
                    } else {
                        centre
                    };
                    self.record_insert(
                        Hypothesis {
                            x: x2,
                            y: y2,
                            z: v.z,
                            log_odds: math::log_odds(prob),
                            pose,
                            enabled: true,
                        },
                        poses,
                    );
                    written += 1;
                }
            }
        }

        trace!(
            "{:?}: {} steps, {} hypotheses deposited",
            component,
            steps,
            written
        );
        true
    }

    /// Agreement between incoming ray evidence and the existing map at one
    /// voxel, under the inserting pose's ancestry.
    ///
    /// `log_odds(p_ray * p_map + (1 - p_ray) * (1 - p_map))`: positive when
    /// both agree the voxel is occupied or both agree it is clear, negative
    /// when they conflict, zero when the map holds no evidence.
    fn match_contribution(
        &self,
        x: i32,
        y: i32,
        z: i32,
        pose: PoseId,
        p_ray: f32,
        poses: &PoseTable,
    ) -> f64 {
        let Some(cell) = self.cell_at(x, y) else {
            return 0.0;
        };
        match cell.probability_at(pose, poses, &self.hypotheses, x, y, z, false) {
            Some(p_map) => {
                let agreement = p_ray * p_map + (1.0 - p_ray) * (1.0 - p_map);
                math::log_odds(agreement) as f64
            }
            None => 0.0,
        }
    }
}
