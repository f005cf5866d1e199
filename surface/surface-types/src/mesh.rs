//! Polygonal surface mesh.

use crate::points::centroid;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One polygonal cell, stored as an ordered list of point indices.
///
/// Triangles and quads stay inline; larger polygons spill to the heap.
pub type Cell = SmallVec<[u32; 4]>;

/// A cell that references a point outside the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCell {
    /// Index of the offending cell.
    pub cell: usize,
    /// The out-of-range point index it references.
    pub point: u32,
}

/// A surface mesh: point positions plus polygonal cell connectivity.
///
/// Point IDs are positions in `points` and stay stable for the lifetime of
/// the mesh. Each cell lists the IDs of its points in order.
///
/// The registration core never mutates a caller's mesh. Derived meshes
/// (ROI sub-meshes, transformed copies) are new values.
///
/// # Example
///
/// ```
/// use surface_types::{Cell, Point3, SurfaceMesh};
///
/// let mut mesh = SurfaceMesh::new();
/// mesh.points.push(Point3::new(0.0, 0.0, 0.0));
/// mesh.points.push(Point3::new(1.0, 0.0, 0.0));
/// mesh.points.push(Point3::new(1.0, 1.0, 0.0));
/// mesh.points.push(Point3::new(0.0, 1.0, 0.0));
/// mesh.cells.push(Cell::from_slice(&[0, 1, 2, 3]));
///
/// assert_eq!(mesh.point_count(), 4);
/// assert_eq!(mesh.cell(0), Some(&[0, 1, 2, 3][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceMesh {
    /// Point positions, indexed by point ID.
    pub points: Vec<Point3<f64>>,

    /// Polygonal cells as lists of point IDs.
    pub cells: Vec<Cell>,
}

impl SurfaceMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(point_count: usize, cell_count: usize) -> Self {
        Self {
            points: Vec::with_capacity(point_count),
            cells: Vec::with_capacity(cell_count),
        }
    }

    /// Create a mesh from points and cells.
    #[inline]
    #[must_use]
    pub const fn from_parts(points: Vec<Point3<f64>>, cells: Vec<Cell>) -> Self {
        Self { points, cells }
    }

    /// Create a mesh from points and triangle index triples.
    #[must_use]
    pub fn from_triangles(points: Vec<Point3<f64>>, triangles: &[[u32; 3]]) -> Self {
        let cells = triangles.iter().map(|t| Cell::from_slice(t)).collect();
        Self { points, cells }
    }

    /// Create a triangle mesh from raw coordinate and index data.
    ///
    /// * `positions` - Flat array `[x0, y0, z0, x1, y1, z1, ...]`
    /// * `indices` - Flat array of triangle indices `[a0, b0, c0, a1, ...]`
    ///
    /// Returns an empty mesh if either length is not divisible by 3.
    ///
    /// # Example
    ///
    /// ```
    /// use surface_types::SurfaceMesh;
    ///
    /// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = SurfaceMesh::from_raw(&positions, &[0, 1, 2]);
    /// assert_eq!(mesh.point_count(), 3);
    /// assert_eq!(mesh.cell_count(), 1);
    /// ```
    #[must_use]
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> Self {
        if positions.len() % 3 != 0 || indices.len() % 3 != 0 {
            return Self::new();
        }

        let points = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();

        let cells = indices.chunks_exact(3).map(Cell::from_slice).collect();

        Self { points, cells }
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of cells.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// True when the mesh has no points.
    ///
    /// A mesh with points but no cells is a valid point cloud for ICP.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get a point by ID.
    #[inline]
    #[must_use]
    pub fn point(&self, index: usize) -> Option<&Point3<f64>> {
        self.points.get(index)
    }

    /// Get the point IDs of a cell.
    #[inline]
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&[u32]> {
        self.cells.get(index).map(SmallVec::as_slice)
    }

    /// Find the first cell referencing a point outside the mesh.
    ///
    /// Returns `None` when every cell is valid.
    #[must_use]
    pub fn first_invalid_cell(&self) -> Option<InvalidCell> {
        let point_count = self.points.len();
        self.cells.iter().enumerate().find_map(|(cell, ids)| {
            ids.iter()
                .find(|&&p| p as usize >= point_count)
                .map(|&point| InvalidCell { cell, point })
        })
    }

    /// Arithmetic mean of all points, or `None` for an empty mesh.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3<f64>> {
        centroid(&self.points)
    }

    /// Translate every point by the given vector.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for point in &mut self.points {
            *point += offset;
        }
    }
}

/// Generate a latitude/longitude sphere tessellation.
///
/// The layout reproduces the classic VTK sphere source so that point IDs are
/// predictable:
///
/// - ID 0 is the north pole `(0, 0, +r)`, ID 1 the south pole.
/// - Then, for each of `theta_resolution` meridians, the
///   `phi_resolution - 2` interior points from north to south.
/// - Cells are a triangle fan around each pole followed by two triangles per
///   band quad, all wound counter-clockwise from outside.
///
/// Resolutions below 3 are raised to 3.
///
/// # Example
///
/// ```
/// use surface_types::{uv_sphere, Point3};
///
/// let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
/// assert_eq!(sphere.point_count(), 50);
/// assert_eq!(sphere.cell_count(), 96);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn uv_sphere(
    center: Point3<f64>,
    radius: f64,
    theta_resolution: u32,
    phi_resolution: u32,
) -> SurfaceMesh {
    let theta_res = theta_resolution.max(3);
    let phi_res = phi_resolution.max(3);

    // Points per meridian, excluding the poles
    let ring = phi_res - 2;
    let base = ring * theta_res;

    let mut mesh = SurfaceMesh::with_capacity(
        (base + 2) as usize,
        (2 * theta_res + 2 * theta_res * (ring - 1)) as usize,
    );

    mesh.points.push(center + Vector3::new(0.0, 0.0, radius));
    mesh.points.push(center - Vector3::new(0.0, 0.0, radius));

    let delta_phi = std::f64::consts::PI / f64::from(phi_res - 1);
    let delta_theta = std::f64::consts::TAU / f64::from(theta_res);

    for i in 0..theta_res {
        let theta = f64::from(i) * delta_theta;
        for j in 1..=ring {
            let phi = f64::from(j) * delta_phi;
            let r = radius * phi.sin();
            mesh.points.push(
                center + Vector3::new(r * theta.cos(), r * theta.sin(), radius * phi.cos()),
            );
        }
    }

    // North pole fan
    for i in 0..theta_res {
        mesh.cells.push(Cell::from_slice(&[
            ring * i + 2,
            (ring * (i + 1)) % base + 2,
            0,
        ]));
    }

    // South pole fan
    let south_offset = ring - 1 + 2;
    for i in 0..theta_res {
        mesh.cells.push(Cell::from_slice(&[
            ring * i + south_offset,
            1,
            (ring * (i + 1)) % base + south_offset,
        ]));
    }

    // Bands between the poles
    for i in 0..theta_res {
        for j in 0..ring - 1 {
            let a = ring * i + j + 2;
            let c = (ring * (i + 1) + j) % base + 3;
            mesh.cells.push(Cell::from_slice(&[a, a + 1, c]));
            mesh.cells.push(Cell::from_slice(&[a, c, c - 1]));
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_mesh() {
        let mesh = SurfaceMesh::new();
        assert!(mesh.is_empty());
        assert!(mesh.centroid().is_none());
        assert!(mesh.first_invalid_cell().is_none());
    }

    #[test]
    fn point_cloud_is_not_empty() {
        let mut mesh = SurfaceMesh::new();
        mesh.points.push(Point3::new(0.0, 0.0, 0.0));
        assert!(!mesh.is_empty());
        assert_eq!(mesh.cell_count(), 0);
    }

    #[test]
    fn from_raw_rejects_ragged_input() {
        let mesh = SurfaceMesh::from_raw(&[0.0, 1.0], &[0, 1, 2]);
        assert!(mesh.is_empty());
    }

    #[test]
    fn detects_invalid_cell() {
        let mesh = SurfaceMesh::from_triangles(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            &[[0, 1, 2], [0, 2, 7]],
        );
        assert_eq!(
            mesh.first_invalid_cell(),
            Some(InvalidCell { cell: 1, point: 7 })
        );
    }

    #[test]
    fn translate_moves_centroid() {
        let mut mesh = uv_sphere(Point3::origin(), 1.0, 8, 8);
        mesh.translate(Vector3::new(5.0, -2.0, 1.0));
        let c = mesh.centroid().unwrap_or_else(Point3::origin);
        assert_relative_eq!(c.coords, Vector3::new(5.0, -2.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn uv_sphere_layout() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        assert_eq!(sphere.point_count(), 50);
        assert_eq!(sphere.cell_count(), 96);
        assert!(sphere.first_invalid_cell().is_none());

        assert_relative_eq!(sphere.points[0].z, 100.0, epsilon = 1e-12);
        assert_relative_eq!(sphere.points[1].z, -100.0, epsilon = 1e-12);

        for p in &sphere.points {
            assert_relative_eq!(p.coords.norm(), 100.0, epsilon = 1e-9);
        }

        // First fan triangle and first band triangles
        assert_eq!(sphere.cell(0), Some(&[2, 8, 0][..]));
        assert_eq!(sphere.cell(8), Some(&[7, 1, 13][..]));
        assert_eq!(sphere.cell(16), Some(&[2, 3, 9][..]));
        assert_eq!(sphere.cell(17), Some(&[2, 9, 8][..]));
    }

    #[test]
    fn uv_sphere_wraps_last_meridian() {
        let sphere = uv_sphere(Point3::origin(), 1.0, 8, 8);
        // Last north fan triangle closes back onto meridian 0
        assert_eq!(sphere.cell(7), Some(&[44, 2, 0][..]));
    }

    #[test]
    fn uv_sphere_clamps_resolution() {
        let sphere = uv_sphere(Point3::new(1.0, 1.0, 1.0), 2.0, 1, 0);
        assert_eq!(sphere.point_count(), 5);
        assert_eq!(sphere.cell_count(), 6);
        assert!(sphere.first_invalid_cell().is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn mesh_serde_json() {
        let mesh = uv_sphere(Point3::origin(), 1.0, 4, 4);
        let json = serde_json::to_string(&mesh).unwrap_or_default();
        let back: SurfaceMesh = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back.point_count(), mesh.point_count());
        assert_eq!(back.cells, mesh.cells);
    }
}
