//! Whole-surface entry points and output helpers.

use nalgebra::Point3;
use surface_types::SurfaceMesh;

use crate::error::{RegistrationError, RegistrationResult};
use crate::icp::{IcpResult, icp_align};
use crate::params::{MeanDistanceMode, RegistrationParams};
use crate::transform::Transform;

/// Register a whole moving surface onto a whole fixed surface.
///
/// Same as [`icp_align`]; named for symmetry with
/// [`register_roi`](crate::register_roi).
///
/// # Errors
///
/// See [`IcpEngine::run_points`](crate::IcpEngine::run_points).
pub fn register_surfaces(
    fixed: &SurfaceMesh,
    moving: &SurfaceMesh,
    params: &RegistrationParams,
) -> RegistrationResult<IcpResult> {
    icp_align(fixed, moving, params)
}

/// Copy of `mesh` with every point transformed. Cells are unchanged.
///
/// # Example
///
/// ```
/// use surface_registration::{transform_mesh, Transform};
/// use surface_types::{uv_sphere, Point3, Vector3};
///
/// let sphere = uv_sphere(Point3::origin(), 1.0, 8, 8);
/// let moved = transform_mesh(&sphere, &Transform::from_translation(Vector3::new(0.0, 0.0, 5.0)));
///
/// assert_eq!(moved.cells, sphere.cells);
/// assert!((moved.points[0].z - 6.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn transform_mesh(mesh: &SurfaceMesh, transform: &Transform) -> SurfaceMesh {
    SurfaceMesh::from_parts(
        mesh.points
            .iter()
            .map(|p| transform.transform_point(p))
            .collect(),
        mesh.cells.clone(),
    )
}

/// Mean distance between two point sets paired by index.
///
/// # Errors
///
/// - [`RegistrationError::MismatchedCorrespondences`] if the lengths differ
/// - [`RegistrationError::NoCorrespondences`] if both are empty
pub fn mean_distance(
    a: &[Point3<f64>],
    b: &[Point3<f64>],
    mode: MeanDistanceMode,
) -> RegistrationResult<f64> {
    if a.len() != b.len() {
        return Err(RegistrationError::MismatchedCorrespondences {
            source_len: a.len(),
            target_len: b.len(),
        });
    }
    mode.reduce(a.iter().zip(b).map(|(p, q)| (p - q).norm_squared()))
        .ok_or(RegistrationError::NoCorrespondences)
}
