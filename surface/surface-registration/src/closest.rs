//! Exact closest-vertex lookup over a fixed point set.
//!
//! Built once per registration run over the fixed surface and queried for
//! every sampled moving point on every iteration.

use kiddo::SquaredEuclidean;
use kiddo::float::kdtree::KdTree;
use nalgebra::Point3;
use surface_types::{SurfaceMesh, finite_point};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{RegistrationError, RegistrationResult};

/// Leaf bucket size. Large enough that planar scans and sphere rings with many
/// equal coordinates on one axis still split.
const BUCKET_SIZE: usize = 256;

type PointTree = KdTree<f64, u64, 3, BUCKET_SIZE, u32>;

/// Relative widening of the tie search radius.
const TIE_SLACK: f64 = 1e-12;

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index of the closest point.
    pub index: usize,
    /// Squared Euclidean distance to it.
    pub distance_squared: f64,
}

/// Exact nearest-neighbour index over a point set.
///
/// Queries return the point with the minimum Euclidean distance. When several
/// points are equally close the lowest index wins, so results do not depend on
/// the internal tree layout.
///
/// # Example
///
/// ```
/// use surface_registration::ClosestPointIndex;
/// use nalgebra::Point3;
///
/// let points = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
///     Point3::new(1.0, 5.0, 0.0),
/// ];
/// let index = ClosestPointIndex::build(&points).unwrap();
///
/// // Equidistant from points 0 and 1
/// assert_eq!(index.query(&Point3::new(1.0, 0.0, 0.0)), 0);
/// assert_eq!(index.query(&Point3::new(1.0, 4.0, 0.0)), 2);
/// ```
#[derive(Debug)]
pub struct ClosestPointIndex {
    tree: PointTree,
    points: Vec<Point3<f64>>,
}

impl ClosestPointIndex {
    /// Build an index over a point set.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyPointSet`] if `points` is empty
    /// - [`RegistrationError::NonFinitePoint`] if any coordinate is NaN or
    ///   infinite
    pub fn build(points: &[Point3<f64>]) -> RegistrationResult<Self> {
        if points.is_empty() {
            return Err(RegistrationError::EmptyPointSet);
        }
        if let Some(index) = points.iter().position(|p| !finite_point(p)) {
            return Err(RegistrationError::NonFinitePoint { index });
        }

        // Item values are the slice positions
        let mut tree = PointTree::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], i as u64);
        }

        Ok(Self {
            tree,
            points: points.to_vec(),
        })
    }

    /// Build an index over the points of a mesh.
    ///
    /// # Errors
    ///
    /// Same as [`ClosestPointIndex::build`].
    pub fn from_mesh(mesh: &SurfaceMesh) -> RegistrationResult<Self> {
        Self::build(&mesh.points)
    }

    /// Number of indexed points.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; an index cannot be built over an empty set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The indexed points.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Index of the point closest to `point`.
    #[inline]
    #[must_use]
    pub fn query(&self, point: &Point3<f64>) -> usize {
        self.nearest(point).index
    }

    /// Closest point and its squared distance.
    #[must_use]
    pub fn nearest(&self, point: &Point3<f64>) -> Nearest {
        let query = [point.x, point.y, point.z];
        let best = self.tree.nearest_one::<SquaredEuclidean>(&query);

        // Distances are recomputed from the stored points rather than taken
        // from the tree, so the candidate below is always a real point
        #[allow(clippy::cast_possible_truncation)]
        let candidate = self
            .points
            .get(best.item as usize)
            .map_or_else(|| self.scan(point), |p| Nearest {
                index: best.item as usize,
                distance_squared: (p - point).norm_squared(),
            });

        // Everything at most as far as the candidate, lowest index on ties
        let radius = candidate
            .distance_squared
            .mul_add(TIE_SLACK, candidate.distance_squared)
            + f64::MIN_POSITIVE;
        self.tree
            .within::<SquaredEuclidean>(&query, radius)
            .into_iter()
            .filter_map(|nn| {
                #[allow(clippy::cast_possible_truncation)]
                let index = nn.item as usize;
                self.points.get(index).map(|p| Nearest {
                    index,
                    distance_squared: (p - point).norm_squared(),
                })
            })
            .chain(std::iter::once(candidate))
            .min_by(|a, b| {
                a.distance_squared
                    .total_cmp(&b.distance_squared)
                    .then(a.index.cmp(&b.index))
            })
            .unwrap_or(candidate)
    }

    /// Linear scan, used only if the tree reports an item it does not hold.
    fn scan(&self, point: &Point3<f64>) -> Nearest {
        self.points
            .iter()
            .enumerate()
            .map(|(index, p)| Nearest {
                index,
                distance_squared: (p - point).norm_squared(),
            })
            .min_by(|a, b| {
                a.distance_squared
                    .total_cmp(&b.distance_squared)
                    .then(a.index.cmp(&b.index))
            })
            .unwrap_or(Nearest {
                index: 0,
                distance_squared: f64::INFINITY,
            })
    }

    /// Closest point for each query, in query order.
    ///
    /// Runs on the rayon pool when the `parallel` feature is enabled.
    #[must_use]
    pub fn nearest_many(&self, queries: &[Point3<f64>]) -> Vec<Nearest> {
        #[cfg(feature = "parallel")]
        {
            queries.par_iter().map(|q| self.nearest(q)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            queries.iter().map(|q| self.nearest(q)).collect()
        }
    }
}
