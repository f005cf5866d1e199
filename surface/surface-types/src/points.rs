//! Point set helpers.

use nalgebra::{Point3, Vector3};

/// An ordered sequence of 3D positions without connectivity.
///
/// Used for landmark correspondences and as the working buffer of sampled
/// points during ICP. Two point sets used as correspondences are matched by
/// index: point `i` of the source corresponds to point `i` of the target.
pub type PointSet = Vec<Point3<f64>>;

/// Computes the arithmetic mean of a set of points.
///
/// Returns `None` for an empty slice.
///
/// # Example
///
/// ```
/// use surface_types::{centroid, Point3};
///
/// let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 6.0)];
/// let c = centroid(&points).unwrap();
/// assert!((c - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
/// ```
#[must_use]
pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / n))
}

/// Returns true if every coordinate of the point is finite.
#[inline]
#[must_use]
pub fn finite_point(point: &Point3<f64>) -> bool {
    point.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn centroid_of_empty_is_none() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn centroid_of_square() {
        let points = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, 1.0),
        ];
        let c = centroid(&points).unwrap_or_else(Point3::origin);
        assert_relative_eq!(c.coords, Vector3::new(1.0, 1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn finite_point_rejects_nan() {
        assert!(finite_point(&Point3::new(1.0, 2.0, 3.0)));
        assert!(!finite_point(&Point3::new(f64::NAN, 0.0, 0.0)));
        assert!(!finite_point(&Point3::new(0.0, f64::INFINITY, 0.0)));
    }
}
