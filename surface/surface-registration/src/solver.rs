//! Closed-form transform estimation from paired points.
//!
//! Given source points `sᵢ` and target points `tᵢ` matched by index, finds the
//! transform of the requested class that minimises `Σ ‖T(sᵢ) − tᵢ‖²`.
//! Rotations use the SVD of the cross-covariance (Kabsch/Umeyama); the affine
//! fit is plain linear least squares.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Point3, Unit, UnitQuaternion, Vector3};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, RegistrationResult};
use crate::transform::Transform;

/// Ratio of singular values below which a direction counts as missing.
const RANK_TOLERANCE: f64 = 1e-12;

/// Class of transform fitted to landmark pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LandmarkTransformMode {
    /// Rotation and translation.
    #[default]
    RigidBody,
    /// Rotation, translation and one uniform scale.
    Similarity,
    /// Any linear map plus translation.
    Affine,
}

impl LandmarkTransformMode {
    /// Human-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RigidBody => "rigid",
            Self::Similarity => "similarity",
            Self::Affine => "affine",
        }
    }
}

impl std::fmt::Display for LandmarkTransformMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the transform that best maps `source` onto `target`.
///
/// Point `i` of `source` corresponds to point `i` of `target`.
///
/// Degenerate configurations are handled rather than rejected:
///
/// - A single pair, or source points that all coincide, yields a pure
///   translation between the centroids.
/// - Collinear pairs (including exactly two) get the smallest rotation that
///   turns the source line onto the target line. Rotation about the line
///   itself is left at zero.
/// - Coplanar pairs in rigid or similarity mode get a proper rotation; the
///   reflection the raw SVD may produce is removed.
/// - An affine fit to source points that do not span 3D keeps the identity
///   along the directions they do not span.
///
/// Each fallback is reported with `warn!`.
///
/// # Errors
///
/// - [`RegistrationError::MismatchedCorrespondences`] if the lengths differ
/// - [`RegistrationError::NoCorrespondences`] if there are no points
/// - [`RegistrationError::SvdFailed`] if a decomposition fails
///
/// # Example
///
/// ```
/// use surface_registration::{solve_landmark_transform, LandmarkTransformMode};
/// use nalgebra::{Point3, Vector3};
///
/// let source = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.0, 10.0, 0.0),
///     Point3::new(0.0, -10.0, 0.0),
/// ];
/// let target = [
///     Point3::new(10.0, 0.0, 0.0),
///     Point3::new(10.0, 10.0, 0.0),
///     Point3::new(10.0, -10.0, 0.0),
/// ];
///
/// let t = solve_landmark_transform(&source, &target, LandmarkTransformMode::RigidBody).unwrap();
/// assert!((t.translation() - Vector3::new(10.0, 0.0, 0.0)).norm() < 1e-9);
/// ```
pub fn solve_landmark_transform(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
    mode: LandmarkTransformMode,
) -> RegistrationResult<Transform> {
    if source.len() != target.len() {
        return Err(RegistrationError::MismatchedCorrespondences {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    if source.is_empty() {
        return Err(RegistrationError::NoCorrespondences);
    }

    let (source_centroid, source_centered) = center(source);
    let (target_centroid, target_centered) = center(target);

    let source_spread: f64 = source_centered.iter().map(Vector3::norm_squared).sum();
    if source.len() == 1 || source_spread <= f64::MIN_POSITIVE {
        if source.len() > 1 {
            warn!(
                points = source.len(),
                "Source landmarks coincide, solving translation only"
            );
        }
        return Ok(Transform::from_translation(target_centroid - source_centroid));
    }

    let linear = match mode {
        LandmarkTransformMode::RigidBody => best_rotation(&source_centered, &target_centered)?,
        LandmarkTransformMode::Similarity => {
            let rotation = best_rotation(&source_centered, &target_centered)?;
            let projected: f64 = source_centered
                .iter()
                .zip(&target_centered)
                .map(|(s, t)| (rotation * s).dot(t))
                .sum();
            rotation * (projected / source_spread)
        }
        LandmarkTransformMode::Affine => best_linear(&source_centered, &target_centered)?,
    };

    let translation = target_centroid - linear * source_centroid;
    Ok(Transform::from_linear_and_translation(&linear, translation))
}

/// Centroid and centred coordinates of a non-empty point set.
fn center(points: &[Point3<f64>]) -> (Vector3<f64>, Vec<Vector3<f64>>) {
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let centroid = points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n;
    let centered = points.iter().map(|p| p.coords - centroid).collect();
    (centroid, centered)
}

/// Rotation maximising `Σ tᵢ · R sᵢ` over centred sets.
fn best_rotation(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
) -> RegistrationResult<Matrix3<f64>> {
    // Cross-covariance H = Σ sᵢ tᵢᵀ
    let h: Matrix3<f64> = source
        .iter()
        .zip(target)
        .map(|(s, t)| s * t.transpose())
        .sum();

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(RegistrationError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(RegistrationError::SvdFailed)?;
    let sigma = svd.singular_values;

    let largest = sigma.imax();
    let smallest = sigma.imin();

    if sigma[largest] <= f64::MIN_POSITIVE {
        warn!(
            points = source.len(),
            "Target landmarks coincide, keeping orientation"
        );
        return Ok(Matrix3::identity());
    }

    // All three equal when the cross-covariance is isotropic
    let middle = if largest == smallest {
        (largest + 1) % 3
    } else {
        3 - largest - smallest
    };

    if sigma[middle] <= sigma[largest] * RANK_TOLERANCE {
        // Only one direction is constrained: the landmarks lie on a line
        warn!(
            points = source.len(),
            "Landmarks are collinear, using the minimal rotation between their lines"
        );
        let source_dir = u.column(largest).into_owned();
        let target_dir = v_t.row(largest).transpose();
        return Ok(minimal_rotation(&source_dir, &target_dir));
    }

    let mut v = v_t.transpose();
    if (v * u.transpose()).determinant() < 0.0 {
        // Reflection: flip the least constrained axis
        v.column_mut(smallest).neg_mut();
    }

    Ok(v * u.transpose())
}

/// Smallest rotation taking direction `from` onto direction `to`.
fn minimal_rotation(from: &Vector3<f64>, to: &Vector3<f64>) -> Matrix3<f64> {
    let rotation = UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        // Opposite directions: half turn about any perpendicular axis
        let helper = if from.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(from.cross(&helper)), PI)
    });
    *rotation.to_rotation_matrix().matrix()
}

/// Least-squares linear map `A` minimising `Σ ‖A sᵢ − tᵢ‖²` over centred sets.
fn best_linear(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
) -> RegistrationResult<Matrix3<f64>> {
    let scatter: Matrix3<f64> = source.iter().map(|s| s * s.transpose()).sum();
    let cross: Matrix3<f64> = source
        .iter()
        .zip(target)
        .map(|(s, t)| t * s.transpose())
        .sum();

    let sigma = scatter.singular_values();
    let full_rank = sigma.min() > sigma.max() * RANK_TOLERANCE;

    if full_rank {
        if let Some(inverse) = scatter.try_inverse() {
            return Ok(cross * inverse);
        }
    }

    warn!(
        points = source.len(),
        "Affine landmarks do not span 3D, keeping identity on missing directions"
    );

    let pseudo = scatter
        .pseudo_inverse(sigma.max() * RANK_TOLERANCE)
        .map_err(|_| RegistrationError::SvdFailed)?;
    let null_projector = Matrix3::identity() - scatter * pseudo;
    Ok(cross * pseudo + null_projector)
}
