//! Point/cell incidence for surface meshes.
//!
//! Provides the two lookups region growing needs: the cells incident to a
//! point, and the points of a cell.

use smallvec::SmallVec;
use surface_types::SurfaceMesh;

use crate::error::{TopologyError, TopologyResult};

/// Incidence index over a borrowed mesh.
///
/// Cell → points comes straight from the mesh; point → cells is built once
/// in [`MeshAdjacency::build`]. Cell lists per point are in ascending cell
/// order.
#[derive(Debug, Clone)]
pub struct MeshAdjacency<'a> {
    mesh: &'a SurfaceMesh,
    point_cells: Vec<SmallVec<[u32; 8]>>,
}

impl<'a> MeshAdjacency<'a> {
    /// Build the incidence index for a mesh.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidCell`] if any cell references a point
    /// outside the mesh.
    ///
    /// # Example
    ///
    /// ```
    /// use surface_topology::MeshAdjacency;
    /// use surface_types::{Point3, SurfaceMesh};
    ///
    /// let mesh = SurfaceMesh::from_triangles(
    ///     vec![
    ///         Point3::new(0.0, 0.0, 0.0),
    ///         Point3::new(1.0, 0.0, 0.0),
    ///         Point3::new(0.0, 1.0, 0.0),
    ///         Point3::new(1.0, 1.0, 0.0),
    ///     ],
    ///     &[[0, 1, 2], [1, 3, 2]],
    /// );
    ///
    /// let adjacency = MeshAdjacency::build(&mesh).unwrap();
    /// assert_eq!(adjacency.point_cells(1), &[0, 1]);
    /// assert_eq!(adjacency.neighbors(0), vec![1, 2]);
    /// ```
    pub fn build(mesh: &'a SurfaceMesh) -> TopologyResult<Self> {
        if let Some(invalid) = mesh.first_invalid_cell() {
            return Err(TopologyError::InvalidCell {
                cell: invalid.cell,
                point: invalid.point,
                point_count: mesh.point_count(),
            });
        }

        let mut point_cells: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); mesh.point_count()];

        for (cell_idx, cell) in mesh.cells.iter().enumerate() {
            let cell_id = u32::try_from(cell_idx).unwrap_or(u32::MAX);
            for &p in cell {
                let incident = &mut point_cells[p as usize];
                // A polygon listing the same point twice counts once
                if incident.last() != Some(&cell_id) {
                    incident.push(cell_id);
                }
            }
        }

        Ok(Self { mesh, point_cells })
    }

    /// The mesh this index was built over.
    #[inline]
    #[must_use]
    pub const fn mesh(&self) -> &'a SurfaceMesh {
        self.mesh
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.point_cells.len()
    }

    /// Number of cells.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.mesh.cell_count()
    }

    /// Cells incident to a point, in ascending order.
    ///
    /// Returns an empty slice for an out-of-range point.
    #[inline]
    #[must_use]
    pub fn point_cells(&self, point: usize) -> &[u32] {
        self.point_cells.get(point).map_or(&[][..], SmallVec::as_slice)
    }

    /// Points of a cell, in cell order.
    ///
    /// Returns an empty slice for an out-of-range cell.
    #[inline]
    #[must_use]
    pub fn cell_points(&self, cell: usize) -> &[u32] {
        self.mesh.cell(cell).unwrap_or(&[])
    }

    /// Points sharing at least one cell with `point`, sorted and unique.
    #[must_use]
    pub fn neighbors(&self, point: usize) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .point_cells(point)
            .iter()
            .flat_map(|&c| self.cell_points(c as usize).iter().copied())
            .filter(|&p| p as usize != point)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
