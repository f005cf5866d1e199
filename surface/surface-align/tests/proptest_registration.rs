//! Property-based tests for the landmark solver, ICP sampling and ROI growth.
//!
//! Run with: cargo test -p surface-align -- proptest

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::VecDeque;

use nalgebra::Rotation3;
use proptest::prelude::*;
use surface_align::prelude::*;
use surface_align::topology::MeshAdjacency;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

fn arb_cloud(min: usize, max: usize) -> impl Strategy<Value = Vec<Point3<f64>>> {
    prop::collection::vec(arb_point(), min..=max)
}

fn arb_rigid() -> impl Strategy<Value = Transform> {
    (
        prop::array::uniform3(-std::f64::consts::PI..std::f64::consts::PI),
        prop::array::uniform3(-50.0..50.0f64),
    )
        .prop_map(|([ax, ay, az], [tx, ty, tz])| {
            let rotation = Rotation3::new(Vector3::new(ax, ay, az) / 2.0);
            Transform::from_linear_and_translation(rotation.matrix(), Vector3::new(tx, ty, tz))
        })
}

/// Clouds whose spread is wide enough in every direction to pin a rotation.
fn well_spread(points: &[Point3<f64>]) -> bool {
    let Some(c) = surface_align::types::centroid(points) else {
        return false;
    };
    let scatter = points
        .iter()
        .map(|p| (p - c) * (p - c).transpose())
        .fold(nalgebra::Matrix3::zeros(), |acc, m| acc + m);
    scatter.symmetric_eigenvalues().min() > 10.0
}

fn hop_distances(adjacency: &MeshAdjacency<'_>, seed: u32) -> Vec<Option<u32>> {
    let mut hops = vec![None; adjacency.point_count()];
    hops[seed as usize] = Some(0);
    let mut queue = VecDeque::from([seed]);
    while let Some(p) = queue.pop_front() {
        let next = hops[p as usize].unwrap() + 1;
        for n in adjacency.neighbors(p as usize) {
            if hops[n as usize].is_none() {
                hops[n as usize] = Some(next);
                queue.push_back(n);
            }
        }
    }
    hops
}

// =============================================================================
// Solver properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_rigid_fit_reproduces_motion(
        source in arb_cloud(4, 30),
        motion in arb_rigid(),
    ) {
        prop_assume!(well_spread(&source));
        let target: Vec<_> = source.iter().map(|p| motion.transform_point(p)).collect();

        let fit = solve_landmark_transform(&source, &target, LandmarkTransformMode::RigidBody)
            .unwrap();

        for (s, t) in source.iter().zip(&target) {
            prop_assert!((fit.transform_point(s) - t).norm() < 1e-6);
        }
        prop_assert!((fit.linear().determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn proptest_similarity_fit_recovers_scale(
        source in arb_cloud(4, 30),
        motion in arb_rigid(),
        scale in 0.2..5.0f64,
    ) {
        prop_assume!(well_spread(&source));
        let target: Vec<_> = source
            .iter()
            .map(|p| motion.transform_point(&Point3::from(p.coords * scale)))
            .collect();

        let fit = solve_landmark_transform(&source, &target, LandmarkTransformMode::Similarity)
            .unwrap();

        prop_assert!((fit.scale_factor() - scale).abs() < 1e-6 * scale.max(1.0));
    }

    #[test]
    fn proptest_bottom_row_is_homogeneous(
        source in arb_cloud(1, 12),
        target in arb_cloud(12, 12),
        mode in prop_oneof![
            Just(LandmarkTransformMode::RigidBody),
            Just(LandmarkTransformMode::Similarity),
            Just(LandmarkTransformMode::Affine),
        ],
    ) {
        let target = &target[..source.len()];
        let fit = solve_landmark_transform(&source, target, mode).unwrap();
        let m = fit.matrix();
        prop_assert_eq!([m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)]], [0.0, 0.0, 0.0, 1.0]);
    }
}

// =============================================================================
// ICP and ROI properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn proptest_sample_count_respects_cap(
        moving in arb_cloud(1, 400),
        max_landmarks in 1usize..250,
    ) {
        let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let params = RegistrationParams::new()
            .with_max_iterations(2)
            .with_max_landmarks(max_landmarks);

        let result = IcpEngine::new(params).run_points(&fixed.points, &moving).unwrap();

        prop_assert!(result.landmark_count <= max_landmarks);
        let step = moving.len().div_ceil(max_landmarks);
        prop_assert_eq!(result.landmark_count, moving.len().div_ceil(step));
        prop_assert!(result.state.is_terminal());
    }

    #[test]
    fn proptest_roi_stays_within_radius(seed in 0u32..50, radius in 0u32..5) {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let adjacency = MeshAdjacency::build(&sphere).unwrap();
        let hops = hop_distances(&adjacency, seed);

        let region = grow_region(&adjacency, &RoiSpec::new().with_seed(seed, radius)).unwrap();

        prop_assert!(region.contains(seed));
        for &p in region.points() {
            prop_assert!(hops[p as usize].is_some_and(|h| h <= radius));
        }
        for (p, h) in hops.iter().enumerate() {
            if h.is_some_and(|h| h <= radius) {
                prop_assert!(region.contains(u32::try_from(p).unwrap()));
            }
        }
    }
}
