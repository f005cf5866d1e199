//! Region-restricted surface registration.

use surface_topology::{RoiSpec, extract_roi};
use surface_types::SurfaceMesh;
use tracing::info;

use crate::closest::ClosestPointIndex;
use crate::error::RegistrationResult;
use crate::icp::{IcpResult, icp_align};
use crate::landmarks::LandmarkSet;
use crate::params::RegistrationParams;

/// Register two surfaces using only the regions around their ROI seeds.
///
/// Both ROIs are grown and cut out as sub-meshes, then ICP aligns the moving
/// sub-mesh onto the fixed one. The returned transform applies to the whole
/// moving surface since extraction keeps coordinates unchanged.
///
/// # Errors
///
/// - Topology errors (empty mesh, empty ROI, seed out of range, invalid cell)
///   from either extraction
/// - ICP errors, including [`crate::RegistrationError::EmptyFixed`] or
///   [`crate::RegistrationError::EmptyMoving`] when an ROI keeps no cells
///
/// # Example
///
/// ```
/// use surface_registration::{register_roi, RegistrationParams};
/// use surface_topology::RoiSpec;
/// use surface_types::{uv_sphere, Point3, Vector3};
///
/// let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
/// let mut moving = fixed.clone();
/// moving.translate(Vector3::new(2.0, 0.0, 0.0));
///
/// let roi = RoiSpec::new().with_seed(0, 2);
/// let params = RegistrationParams::default().with_check_every_iteration(true);
/// let result = register_roi(&fixed, &roi, &moving, &roi, &params).unwrap();
///
/// assert!(result.converged());
/// assert_eq!(result.landmark_count, 17);
/// ```
pub fn register_roi(
    fixed: &SurfaceMesh,
    fixed_roi: &RoiSpec,
    moving: &SurfaceMesh,
    moving_roi: &RoiSpec,
    params: &RegistrationParams,
) -> RegistrationResult<IcpResult> {
    let fixed_part = extract_roi(fixed, fixed_roi)?;
    let moving_part = extract_roi(moving, moving_roi)?;

    info!(
        fixed_points = fixed_part.mesh.point_count(),
        moving_points = moving_part.mesh.point_count(),
        "Registering ROI sub-meshes"
    );

    icp_align(&fixed_part.mesh, &moving_part.mesh, params)
}

/// Register two surfaces around their landmarks.
///
/// Each landmark set is projected onto its own surface and its ROI radii turn
/// into seeds; then [`register_roi`] runs on the result. The caller's sets are
/// left untouched.
///
/// # Errors
///
/// Same as [`register_roi`], plus [`crate::RegistrationError::EmptyPointSet`]
/// when a surface has no points to project onto.
pub fn register_roi_from_landmarks(
    fixed: &SurfaceMesh,
    fixed_landmarks: &LandmarkSet,
    moving: &SurfaceMesh,
    moving_landmarks: &LandmarkSet,
    params: &RegistrationParams,
) -> RegistrationResult<IcpResult> {
    let fixed_roi = projected_roi(fixed, fixed_landmarks)?;
    let moving_roi = projected_roi(moving, moving_landmarks)?;
    register_roi(fixed, &fixed_roi, moving, &moving_roi, params)
}

fn projected_roi(surface: &SurfaceMesh, landmarks: &LandmarkSet) -> RegistrationResult<RoiSpec> {
    let index = ClosestPointIndex::from_mesh(surface)?;
    let mut projected = landmarks.clone();
    projected.project(&index);
    projected.roi_spec()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::RegistrationError;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use surface_topology::TopologyError;
    use surface_types::uv_sphere;

    #[test]
    fn roi_registration_recovers_shift() {
        let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let mut moving = fixed.clone();
        moving.translate(Vector3::new(0.0, 3.0, -2.0));

        let roi = RoiSpec::new().with_seed(9, 2).with_seed(35, 2);
        let params = RegistrationParams::default().with_check_every_iteration(true);
        let result = register_roi(&fixed, &roi, &moving, &roi, &params).unwrap();

        assert!(result.converged());
        assert_relative_eq!(
            result.transform.translation(),
            Vector3::new(0.0, -3.0, 2.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn landmark_rois() {
        let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let mut moving = fixed.clone();
        moving.translate(Vector3::new(1.0, 1.0, 0.0));

        let mut fixed_marks = LandmarkSet::new();
        let f = fixed_marks.add("pole", Point3::new(0.0, 0.0, 130.0));
        fixed_marks.set_roi_radius(f, 2).unwrap();

        let mut moving_marks = LandmarkSet::new();
        let m = moving_marks.add("pole", Point3::new(1.0, 1.0, 95.0));
        moving_marks.set_roi_radius(m, 2).unwrap();

        let params = RegistrationParams::default().with_check_every_iteration(true);
        let result =
            register_roi_from_landmarks(&fixed, &fixed_marks, &moving, &moving_marks, &params)
                .unwrap();

        assert!(result.converged());
        assert_relative_eq!(
            result.transform.translation(),
            Vector3::new(-1.0, -1.0, 0.0),
            epsilon = 1e-6
        );
        // Caller's landmarks were not projected
        assert!(fixed_marks.get(f).unwrap().projected_point.is_none());
    }

    #[test]
    fn empty_roi_is_rejected() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let err = register_roi(
            &sphere,
            &RoiSpec::new(),
            &sphere,
            &RoiSpec::new().with_seed(0, 1),
            &RegistrationParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, RegistrationError::Topology(TopologyError::EmptyRoi));
    }

    #[test]
    fn seed_only_roi_leaves_nothing_to_register() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let err = register_roi(
            &sphere,
            &RoiSpec::new().with_seed(4, 0),
            &sphere,
            &RoiSpec::new().with_seed(4, 1),
            &RegistrationParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, RegistrationError::EmptyFixed);
    }
}
