//! End-to-end scenarios for the multi-hypothesis voxel grid.
//!
//! These tests drive the public surface the particle filter uses: ray
//! insertion under a pose, ancestry-conditioned queries, retraction on
//! resampling, and the bounded sweep.

use approx::assert_relative_eq;
use drishti_map::{
    EvidenceRay, PoseId, PoseTable, SensorModelLookup, VoxelCoord, VoxelGrid, VoxelGridConfig,
    WorldPoint3,
};

fn create_test_grid() -> VoxelGrid {
    VoxelGrid::new(VoxelGridConfig {
        width: 32,
        height: 32,
        cell_size_mm: 50.0,
        localisation_radius_mm: 100.0,
        max_mapping_range_mm: 10_000.0,
        centre: WorldPoint3::default(),
    })
    .unwrap()
}

/// Flat sensor model: every tabulated step pulls 0.6 toward occupied.
fn create_test_lookup() -> SensorModelLookup {
    SensorModelLookup::from_rows(vec![vec![0.6; 64]; 32])
}

/// A ray along +X at the given lateral offset.
fn x_ray(near_x: f32, far_x: f32, y: f32, width: f32, disparity: f32) -> EvidenceRay {
    EvidenceRay::new(
        WorldPoint3::new(near_x, y, 0.0),
        WorldPoint3::new(far_x, y, 0.0),
        WorldPoint3::new(0.0, y, 0.0),
        width,
        disparity,
        0.5,
    )
}

fn insert_ray(
    grid: &mut VoxelGrid,
    poses: &mut PoseTable,
    pose: PoseId,
    ray: &EvidenceRay,
) -> f64 {
    let lookup = create_test_lookup();
    let cam = WorldPoint3::new(0.0, 0.0, 0.0);
    grid.integrate_ray(ray, pose, &lookup, &cam, &cam, poses)
}

/// Count enabled hypotheses by walking every resident cell entry.
fn count_enabled(grid: &VoxelGrid) -> (usize, usize) {
    let mut enabled = 0;
    let mut disabled = 0;
    for y in 0..grid.width() as i32 {
        for x in 0..grid.width() as i32 {
            if let Some(cell) = grid.cell_at(x, y) {
                for id in cell.hypotheses() {
                    if grid.hypothesis(id).unwrap().enabled {
                        enabled += 1;
                    } else {
                        disabled += 1;
                    }
                }
            }
        }
    }
    (enabled, disabled)
}

#[test]
fn test_single_ray_on_empty_grid() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();
    let p1 = poses.insert_root(1);

    let score = insert_ray(&mut grid, &mut poses, p1, &x_ray(500.0, 700.0, 0.0, 50.0, 4.0));

    // Nothing to match against: the score is exactly zero.
    assert_eq!(score, 0.0);

    // The occupied region midpoint lands near cell (28, 16, 0):
    // x = (600 + 800) / 50, y at the footprint centreline.
    let cell = grid.cell_at(28, 16).expect("occupied cell not created");
    assert!(cell.has_evidence(0));
    assert!(grid.total_valid_hypotheses() >= 1);
    assert_eq!(grid.total_garbage_hypotheses(), 0);
}

#[test]
fn test_reinforcement_across_generations() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();
    let ray = x_ray(500.0, 700.0, 0.0, 50.0, 4.0);

    let p1 = poses.insert_root(1);
    insert_ray(&mut grid, &mut poses, p1, &ray);
    let p2 = poses.spawn_child(p1, 2);
    insert_ray(&mut grid, &mut poses, p2, &ray);

    // p2 sees its ancestor's evidence but not its own same-step writes.
    let p = grid
        .probability_at(p2, &poses, VoxelCoord::new(28, 16, 0), false)
        .expect("ancestor evidence missing");
    assert!(p > 0.5, "reinforced cell should lean occupied, got {}", p);

    let column = grid.column_probability(p2, &poses, 28, 16);
    assert!(column > 0.5);
}

#[test]
fn test_temporal_gate_end_to_end() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();
    let p1 = poses.insert_root(7);
    insert_ray(&mut grid, &mut poses, p1, &x_ray(500.0, 700.0, 0.0, 50.0, 4.0));

    // The writer queries its own deposit: gated out entirely.
    assert!(grid
        .probability_at(p1, &poses, VoxelCoord::new(28, 16, 0), false)
        .is_none());

    // A later descendant sees it.
    let p2 = poses.spawn_child(p1, 8);
    assert!(grid
        .probability_at(p2, &poses, VoxelCoord::new(28, 16, 0), false)
        .is_some());

    // A sibling spawned at the same time step as the writer does not.
    let sibling = poses.spawn_child(p1, 7);
    assert!(grid
        .probability_at(sibling, &poses, VoxelCoord::new(28, 16, 0), false)
        .is_none());
}

#[test]
fn test_tombstone_then_sweep() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();
    let ray = x_ray(500.0, 700.0, 0.0, 50.0, 4.0);

    let p1 = poses.insert_root(1);
    insert_ray(&mut grid, &mut poses, p1, &ray);
    let p2 = poses.spawn_child(p1, 2);
    insert_ray(&mut grid, &mut poses, p2, &ray);

    // Resampling drops p1: retract everything it wrote.
    let dropped = poses.remove(p1).unwrap();
    grid.retract_pose(&dropped);

    // p2 is back to baseline immediately, before any sweep.
    assert!(grid
        .probability_at(p2, &poses, VoxelCoord::new(28, 16, 0), false)
        .is_none());
    assert_relative_eq!(grid.column_probability(p2, &poses, 28, 16), 0.5);

    // Full sweep reclaims every tombstone.
    grid.garbage_collect(100);
    assert_eq!(grid.total_garbage_hypotheses(), 0);
    assert_eq!(grid.pending_garbage_cells(), 0);

    let (enabled, disabled) = count_enabled(&grid);
    assert_eq!(disabled, 0, "disabled hypotheses survived the sweep");
    assert_eq!(enabled, grid.total_valid_hypotheses());
}

#[test]
fn test_localisation_score_rewards_agreement() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();
    let ray = x_ray(500.0, 700.0, 0.0, 50.0, 4.0);

    let p1 = poses.insert_root(1);
    insert_ray(&mut grid, &mut poses, p1, &ray);

    // A matching ray under a descendant scores positive.
    let p2 = poses.spawn_child(p1, 2);
    let aligned = insert_ray(&mut grid, &mut poses, p2, &ray);
    assert!(aligned > 0.0, "aligned ray should score > 0, got {}", aligned);

    // A laterally offset ray under a sibling scores no better.
    let p3 = poses.spawn_child(p1, 2);
    let misaligned = insert_ray(
        &mut grid,
        &mut poses,
        p3,
        &x_ray(500.0, 700.0, 150.0, 50.0, 4.0),
    );
    assert!(
        misaligned <= aligned,
        "misaligned {} should not beat aligned {}",
        misaligned,
        aligned
    );
}

#[test]
fn test_small_disparity_populates_full_tail() {
    let mut poses = PoseTable::new();
    let p1 = poses.insert_root(1);

    // Wider footprint so a 2m ray fits inside the mappable band.
    let mut grid = VoxelGrid::new(VoxelGridConfig {
        width: 64,
        height: 32,
        cell_size_mm: 50.0,
        localisation_radius_mm: 100.0,
        max_mapping_range_mm: 10_000.0,
        centre: WorldPoint3::default(),
    })
    .unwrap();

    let ray = EvidenceRay::new(
        WorldPoint3::new(-1_500.0, 0.0, 0.0),
        WorldPoint3::new(500.0, 0.0, 0.0),
        WorldPoint3::new(-1_550.0, 0.0, 0.0),
        200.0,
        0.3,
        0.5,
    );
    let lookup = create_test_lookup();
    let cam = WorldPoint3::new(-1_550.0, 0.0, 0.0);
    grid.integrate_ray(&ray, p1, &lookup, &cam, &cam, &mut poses);

    // Far past the diamond's peak the profile must still span the full
    // ray width (2 cells either side of the centreline at y = 32).
    let tail_x = grid.world_to_voxel(&WorldPoint3::new(450.0, 0.0, 0.0)).x;
    let lateral: Vec<i32> = poses
        .get(p1)
        .unwrap()
        .written()
        .ids()
        .filter_map(|id| {
            let h = grid.hypothesis(id).unwrap();
            (h.x == tail_x).then_some(h.y)
        })
        .collect();
    assert!(
        lateral.contains(&30) && lateral.contains(&34),
        "tail width collapsed: {:?}",
        lateral
    );
}

#[test]
fn test_probability_image_marks_occupied_cell() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();
    let ray = x_ray(500.0, 700.0, 0.0, 50.0, 4.0);

    let p1 = poses.insert_root(1);
    insert_ray(&mut grid, &mut poses, p1, &ray);
    let p2 = poses.spawn_child(p1, 2);
    insert_ray(&mut grid, &mut poses, p2, &ray);

    let mut buf = vec![0u8; 32 * 32 * 3];
    grid.probability_image(p2, &poses, &mut buf, 32, 32);

    let at = (16 * 32 + 28) * 3;
    assert!(
        buf[at] <= 100,
        "reinforced cell should shade occupied, got {}",
        buf[at]
    );

    // Terra incognita stays white.
    assert_eq!(buf[0], 255);
}

#[test]
fn test_counters_survive_mixed_workload() {
    let mut grid = create_test_grid();
    let mut poses = PoseTable::new();

    let p1 = poses.insert_root(1);
    insert_ray(&mut grid, &mut poses, p1, &x_ray(400.0, 600.0, 0.0, 100.0, 3.0));
    let p2 = poses.spawn_child(p1, 2);
    insert_ray(&mut grid, &mut poses, p2, &x_ray(400.0, 600.0, 50.0, 100.0, 3.0));
    let p3 = poses.spawn_child(p2, 3);
    insert_ray(&mut grid, &mut poses, p3, &x_ray(300.0, 500.0, -50.0, 100.0, 5.0));

    let (enabled, disabled) = count_enabled(&grid);
    assert_eq!(enabled, grid.total_valid_hypotheses());
    assert_eq!(disabled, grid.total_garbage_hypotheses());

    // Drop the middle pose; counters must stay consistent throughout.
    let dropped = poses.remove(p2).unwrap();
    grid.retract_pose(&dropped);
    let (enabled, disabled) = count_enabled(&grid);
    assert_eq!(enabled, grid.total_valid_hypotheses());
    assert_eq!(disabled, grid.total_garbage_hypotheses());

    // Partial sweeps converge to a clean grid.
    while grid.pending_garbage_cells() > 0 {
        grid.garbage_collect(25);
    }
    assert_eq!(grid.total_garbage_hypotheses(), 0);
    let (enabled, disabled) = count_enabled(&grid);
    assert_eq!(enabled, grid.total_valid_hypotheses());
    assert_eq!(disabled, 0);
}
