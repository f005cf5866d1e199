//! Topological region growing from seed points.
//!
//! A region of interest is a set of seed points, each with a radius measured
//! in cell-adjacency hops. Growing the region walks outward from every seed
//! through the cells incident to each frontier point.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::adjacency::MeshAdjacency;
use crate::error::{TopologyError, TopologyResult};

/// Seeds of a region of interest, each with a hop radius.
///
/// Radius 0 selects only the seed itself. Seeds are kept in ascending point
/// order. Inserting a seed that is already present keeps the larger radius.
///
/// # Example
///
/// ```
/// use surface_topology::RoiSpec;
///
/// let mut roi = RoiSpec::new();
/// roi.insert(12, 2);
/// roi.insert(12, 1);
/// roi.insert(40, 0);
///
/// assert_eq!(roi.radius(12), Some(2));
/// assert_eq!(roi.len(), 2);
/// assert_eq!(roi.max_radius(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoiSpec {
    seeds: BTreeMap<u32, u32>,
}

impl RoiSpec {
    /// Create an empty ROI.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seeds: BTreeMap::new(),
        }
    }

    /// Add a seed point with a hop radius.
    ///
    /// If the seed already exists the larger of the two radii is kept.
    pub fn insert(&mut self, seed: u32, radius: u32) {
        self.seeds
            .entry(seed)
            .and_modify(|r| *r = (*r).max(radius))
            .or_insert(radius);
    }

    /// Builder form of [`RoiSpec::insert`].
    #[must_use]
    pub fn with_seed(mut self, seed: u32, radius: u32) -> Self {
        self.insert(seed, radius);
        self
    }

    /// Radius of a seed, if present.
    #[must_use]
    pub fn radius(&self, seed: u32) -> Option<u32> {
        self.seeds.get(&seed).copied()
    }

    /// Iterate over `(seed, radius)` pairs in ascending seed order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.seeds.iter().map(|(&s, &r)| (s, r))
    }

    /// Number of seeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// True when there are no seeds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Largest radius of any seed, or 0 for an empty ROI.
    #[must_use]
    pub fn max_radius(&self) -> u32 {
        self.seeds.values().copied().max().unwrap_or(0)
    }
}

impl FromIterator<(u32, u32)> for RoiSpec {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut roi = Self::new();
        for (seed, radius) in iter {
            roi.insert(seed, radius);
        }
        roi
    }
}

impl Extend<(u32, u32)> for RoiSpec {
    fn extend<I: IntoIterator<Item = (u32, u32)>>(&mut self, iter: I) {
        for (seed, radius) in iter {
            self.insert(seed, radius);
        }
    }
}

/// Result of growing a region: the selected points and the cells walked.
#[derive(Debug, Clone, Default)]
pub struct GrownRegion {
    points: HashSet<u32>,
    visited_cells: HashSet<u32>,
}

impl GrownRegion {
    /// True if the point is part of the region.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: u32) -> bool {
        self.points.contains(&point)
    }

    /// Number of selected points.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no point is selected.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The selected points.
    #[must_use]
    pub const fn points(&self) -> &HashSet<u32> {
        &self.points
    }

    /// The selected points in ascending order.
    #[must_use]
    pub fn sorted_points(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self.points.iter().copied().collect();
        out.sort_unstable();
        out
    }

    /// Cells that were expanded while growing.
    ///
    /// These are the cells incident to a point processed with a positive
    /// remaining radius. Not every visited cell lies fully inside the region.
    #[must_use]
    pub const fn visited_cells(&self) -> &HashSet<u32> {
        &self.visited_cells
    }

    /// Per-point selection mask, `true` for selected points.
    ///
    /// Points at or beyond `point_count` are ignored.
    #[must_use]
    pub fn mask(&self, point_count: usize) -> Vec<bool> {
        let mut mask = vec![false; point_count];
        for &p in &self.points {
            if let Some(slot) = mask.get_mut(p as usize) {
                *slot = true;
            }
        }
        mask
    }
}

/// Grow a region of interest over a mesh.
///
/// Every seed is processed with its own radius. Radii are handled from the
/// largest down to 1: each point queued at radius `r` expands into its
/// incident cells that have not been expanded yet, and every point of those
/// cells is queued at `r - 1` unless it is already queued at `r - 1` or
/// higher. A point first reached with a small budget is promoted when a
/// larger budget reaches it later, so seeds never shadow one another.
///
/// The result holds every point that was ever queued, seeds included.
///
/// # Errors
///
/// - [`TopologyError::EmptyRoi`] if the ROI has no seeds
/// - [`TopologyError::SeedOutOfBounds`] if a seed is not a mesh point
///
/// # Example
///
/// ```
/// use surface_topology::{grow_region, MeshAdjacency, RoiSpec};
/// use surface_types::{uv_sphere, Point3};
///
/// let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
/// let adjacency = MeshAdjacency::build(&sphere).unwrap();
///
/// let region = grow_region(&adjacency, &RoiSpec::new().with_seed(0, 1)).unwrap();
/// // The pole plus the first ring of every meridian
/// assert_eq!(region.len(), 9);
/// ```
pub fn grow_region(adjacency: &MeshAdjacency<'_>, roi: &RoiSpec) -> TopologyResult<GrownRegion> {
    if roi.is_empty() {
        return Err(TopologyError::EmptyRoi);
    }

    let point_count = adjacency.point_count();
    if let Some((seed, _)) = roi.iter().find(|&(s, _)| s as usize >= point_count) {
        return Err(TopologyError::SeedOutOfBounds { seed, point_count });
    }

    // Highest radius each point has been queued at
    let mut scheduled: HashMap<u32, u32> = HashMap::with_capacity(roi.len());
    // Points waiting to expand, keyed by remaining radius. Only non-empty
    // levels are stored, so huge radii cost nothing until points reach them.
    let mut buckets: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

    for (seed, radius) in roi.iter() {
        scheduled.insert(seed, radius);
        if radius > 0 {
            buckets.entry(radius).or_default().push(seed);
        }
    }

    let mut visited_cells: HashSet<u32> = HashSet::new();

    while let Some((radius, frontier)) = buckets.pop_last() {
        let next = radius - 1;

        for point in frontier {
            // Promoted and already expanded at a higher radius
            if scheduled.get(&point) != Some(&radius) {
                continue;
            }

            for &cell in adjacency.point_cells(point as usize) {
                if !visited_cells.insert(cell) {
                    continue;
                }

                for &neighbor in adjacency.cell_points(cell as usize) {
                    let promote = scheduled.get(&neighbor).is_none_or(|&r| r < next);
                    if promote {
                        scheduled.insert(neighbor, next);
                        if next > 0 {
                            buckets.entry(next).or_default().push(neighbor);
                        }
                    }
                }
            }
        }

        debug!(
            radius = radius,
            points = scheduled.len(),
            cells = visited_cells.len(),
            "Region growth step"
        );
    }

    Ok(GrownRegion {
        points: scheduled.into_keys().collect(),
        visited_cells,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use surface_types::{Cell, Point3, SurfaceMesh, uv_sphere};

    fn sphere() -> SurfaceMesh {
        uv_sphere(Point3::origin(), 100.0, 8, 8)
    }

    /// Points 0..=10 joined by two-point cells into a polyline.
    fn polyline() -> SurfaceMesh {
        let points = (0..=10).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
        let cells = (0..10u32).map(|i| Cell::from_slice(&[i, i + 1])).collect();
        SurfaceMesh::from_parts(points, cells)
    }

    fn grow(mesh: &SurfaceMesh, roi: &RoiSpec) -> Vec<u32> {
        let adj = MeshAdjacency::build(mesh).unwrap();
        grow_region(&adj, roi).unwrap().sorted_points()
    }

    #[test]
    fn roi_insert_keeps_larger_radius() {
        let roi: RoiSpec = [(3, 1), (3, 4), (3, 2), (7, 0)].into_iter().collect();
        assert_eq!(roi.radius(3), Some(4));
        assert_eq!(roi.radius(7), Some(0));
        assert_eq!(roi.radius(8), None);
        assert_eq!(roi.iter().collect::<Vec<_>>(), vec![(3, 4), (7, 0)]);
    }

    #[test]
    fn radius_zero_selects_seed_only() {
        let mesh = sphere();
        assert_eq!(grow(&mesh, &RoiSpec::new().with_seed(20, 0)), vec![20]);
    }

    #[test]
    fn sphere_radius_one() {
        let mesh = sphere();
        assert_eq!(
            grow(&mesh, &RoiSpec::new().with_seed(9, 1)),
            vec![2, 3, 8, 9, 10, 15, 16]
        );
    }

    #[test]
    fn sphere_radius_two() {
        let mesh = sphere();
        assert_eq!(
            grow(&mesh, &RoiSpec::new().with_seed(35, 2)),
            vec![
                21, 22, 23, 27, 28, 29, 30, 33, 34, 35, 36, 37, 40, 41, 42, 43, 47, 48, 49
            ]
        );
    }

    #[test]
    fn sphere_radius_three_from_pole() {
        let mesh = sphere();
        assert_eq!(
            grow(&mesh, &RoiSpec::new().with_seed(1, 3)),
            vec![
                1, 5, 6, 7, 11, 12, 13, 17, 18, 19, 23, 24, 25, 29, 30, 31, 35, 36, 37, 41, 42,
                43, 47, 48, 49
            ]
        );
    }

    #[test]
    fn polyline_grows_by_hops() {
        let mesh = polyline();
        assert_eq!(grow(&mesh, &RoiSpec::new().with_seed(5, 2)), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn low_radius_seed_is_promoted() {
        let mesh = polyline();
        // Seed 4 starts with no budget but is reached from seed 1 with one hop left
        let roi = RoiSpec::new().with_seed(1, 4).with_seed(4, 0);
        assert_eq!(grow(&mesh, &roi), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn overlapping_seeds_union() {
        let mesh = polyline();
        let roi = RoiSpec::new().with_seed(2, 1).with_seed(8, 1);
        assert_eq!(grow(&mesh, &roi), vec![1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn huge_radius_covers_component() {
        let mesh = polyline();
        let all: Vec<u32> = (0..=10).collect();
        assert_eq!(grow(&mesh, &RoiSpec::new().with_seed(3, u32::MAX)), all);

        let sphere = sphere();
        let region = grow(&sphere, &RoiSpec::new().with_seed(0, 50_000_000).with_seed(7, 2));
        assert_eq!(region.len(), sphere.point_count());
    }

    #[test]
    fn mask_marks_region() {
        let mesh = polyline();
        let adj = MeshAdjacency::build(&mesh).unwrap();
        let region = grow_region(&adj, &RoiSpec::new().with_seed(0, 1)).unwrap();

        let mask = region.mask(mesh.point_count());
        assert_eq!(mask.len(), 11);
        assert!(mask[0] && mask[1]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 2);
        assert_eq!(region.visited_cells().len(), 1);
    }

    #[test]
    fn empty_roi_is_rejected() {
        let mesh = sphere();
        let adj = MeshAdjacency::build(&mesh).unwrap();
        assert_eq!(
            grow_region(&adj, &RoiSpec::new()).unwrap_err(),
            TopologyError::EmptyRoi
        );
    }

    #[test]
    fn seed_out_of_bounds() {
        let mesh = sphere();
        let adj = MeshAdjacency::build(&mesh).unwrap();
        let err = grow_region(&adj, &RoiSpec::new().with_seed(50, 1)).unwrap_err();
        assert_eq!(
            err,
            TopologyError::SeedOutOfBounds {
                seed: 50,
                point_count: 50
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn roi_serde_json() {
        let roi = RoiSpec::new().with_seed(4, 2).with_seed(9, 0);
        let json = serde_json::to_string(&roi).unwrap();
        let back: RoiSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, roi);
    }
}
