//! Homogeneous affine transform type for registration results.

use nalgebra::{Matrix3, Matrix4, Point3, RowVector4, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 3D affine transformation stored as a 4x4 homogeneous matrix.
///
/// The bottom row is always `(0, 0, 0, 1)`. Points are transformed as
/// `M · (x, y, z, 1)ᵀ`, so the upper-left 3x3 block is the linear part and
/// the last column is the translation.
///
/// Rigid, similarity and general affine results all share this type; use
/// [`Transform::scale_factor`] to read back the uniform scale of a
/// similarity transform.
///
/// # Example
///
/// ```
/// use surface_registration::Transform;
/// use nalgebra::{Point3, Vector3};
///
/// let shift = Transform::from_translation(Vector3::new(1.0, 2.0, 3.0));
/// let p = shift.transform_point(&Point3::origin());
/// assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
///
/// let back = shift.inverse().unwrap();
/// assert!(back.compose(&shift).is_identity(1e-12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// A pure translation.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_linear_and_translation(&Matrix3::identity(), translation)
    }

    /// Build from a linear 3x3 part and a translation.
    #[must_use]
    pub fn from_linear_and_translation(linear: &Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut matrix = linear.to_homogeneous();
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Self { matrix }
    }

    /// Wrap an existing homogeneous matrix.
    ///
    /// Returns `None` if the bottom row is not `(0, 0, 0, 1)` or any entry is
    /// not finite.
    #[must_use]
    pub fn from_matrix(matrix: Matrix4<f64>) -> Option<Self> {
        let affine_row = matrix.row(3) == RowVector4::new(0.0, 0.0, 0.0, 1.0);
        let finite = matrix.iter().all(|v| v.is_finite());
        (affine_row && finite).then_some(Self { matrix })
    }

    /// The homogeneous matrix.
    #[inline]
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// The upper-left 3x3 linear part.
    #[must_use]
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The translation column.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Transform a point.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }

    /// Transform a direction. Translation is ignored.
    #[inline]
    #[must_use]
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transform_vector(vector)
    }

    /// Composes this transform with another (`self · other`).
    ///
    /// The result applies `other` first, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// The inverse transform, or `None` if the linear part is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let inv_linear = self.linear().try_inverse()?;
        let inv_translation = -(inv_linear * self.translation());
        Some(Self::from_linear_and_translation(&inv_linear, inv_translation))
    }

    /// True if every entry is within `epsilon` of the identity matrix.
    #[must_use]
    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.matrix - Matrix4::identity()).amax() <= epsilon
    }

    /// Uniform scale implied by the linear part: the cube root of its
    /// determinant.
    ///
    /// Exactly 1 for rigid transforms up to rounding. For a general affine
    /// transform this is the geometric mean of the axis scalings.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.linear().determinant().cbrt()
    }
}

impl From<Transform> for Matrix4<f64> {
    fn from(transform: Transform) -> Self {
        transform.matrix
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, UnitQuaternion};
    use std::f64::consts::PI;

    fn rotation_z(angle: f64) -> Matrix3<f64> {
        *Rotation3::from_axis_angle(&Vector3::z_axis(), angle).matrix()
    }

    #[test]
    fn identity_leaves_points() {
        let t = Transform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(t.transform_point(&p).coords, p.coords, epsilon = 1e-12);
        assert!(t.is_identity(0.0));
        assert_eq!(Transform::default(), t);
    }

    #[test]
    fn translation_ignored_for_vectors() {
        let t = Transform::from_linear_and_translation(
            &rotation_z(PI / 2.0),
            Vector3::new(100.0, 100.0, 100.0),
        );
        let v = t.transform_vector(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn compose_applies_right_first() {
        let rotate = Transform::from_linear_and_translation(&rotation_z(PI / 2.0), Vector3::zeros());
        let shift = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));

        // Shift then rotate: (0,0,0) -> (1,0,0) -> (0,1,0)
        let p = rotate.compose(&shift).transform_point(&Point3::origin());
        assert_relative_eq!(p.coords, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);

        // Rotate then shift: (0,0,0) -> (0,0,0) -> (1,0,0)
        let q = shift.compose(&rotate).transform_point(&Point3::origin());
        assert_relative_eq!(q.coords, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn inverse_round_trip() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI / 5.0);
        let linear = q.to_rotation_matrix().matrix() * 1.5;
        let t = Transform::from_linear_and_translation(&linear, Vector3::new(-4.0, 2.0, 9.0));

        let p = Point3::new(1.0, 2.0, 3.0);
        let back = t.inverse().unwrap().transform_point(&t.transform_point(&p));
        assert_relative_eq!(back.coords, p.coords, epsilon = 1e-10);
        assert_relative_eq!(t.scale_factor(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn singular_has_no_inverse() {
        let flat = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.0));
        let t = Transform::from_linear_and_translation(&flat, Vector3::zeros());
        assert!(t.inverse().is_none());
    }

    #[test]
    fn from_matrix_checks_bottom_row() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 5.0;
        let t = Transform::from_matrix(m).unwrap();
        assert_relative_eq!(t.translation(), Vector3::new(5.0, 0.0, 0.0));

        m[(3, 0)] = 1.0;
        assert!(Transform::from_matrix(m).is_none());

        let mut nan = Matrix4::identity();
        nan[(1, 1)] = f64::NAN;
        assert!(Transform::from_matrix(nan).is_none());
    }

    #[test]
    fn is_identity_tolerance() {
        let t = Transform::from_translation(Vector3::new(0.001, 0.0, 0.0));
        assert!(!t.is_identity(1e-10));
        assert!(t.is_identity(0.01));
    }

    #[test]
    fn translation_and_linear_views() {
        let t = Transform::from_linear_and_translation(&rotation_z(0.3), Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(t.linear(), rotation_z(0.3), epsilon = 1e-15);
        assert_relative_eq!(t.translation(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(t.matrix()[(3, 3)], 1.0);
    }
}
