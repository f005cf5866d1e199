//! Point merging and triangulation ahead of ROI growth.
//!
//! Scanned and exported surfaces often carry duplicated points along patch
//! seams and polygons with more than three corners. Duplicates split the
//! cell adjacency so region growth stops at the seam; cleaning first makes
//! hop radii behave the same on every input.

use hashbrown::HashMap;
use surface_types::{Cell, Point3, SurfaceMesh};
use tracing::{debug, info};

use crate::error::{TopologyError, TopologyResult};

/// A cleaned mesh plus the mapping from original point IDs.
#[derive(Debug, Clone)]
pub struct CleanedMesh {
    /// Mesh with merged points, no unused points and triangulated polygons.
    pub mesh: SurfaceMesh,

    /// For each original point, its ID in `mesh`, or `None` if no cell used it.
    pub point_map: Vec<Option<u32>>,

    /// Number of points merged into an earlier duplicate.
    pub merged_points: usize,

    /// Number of cells dropped because merging collapsed them.
    pub dropped_cells: usize,
}

/// Merge duplicate points, drop unused points and triangulate polygons.
///
/// Points closer than `tolerance` are merged into the lowest-numbered one;
/// a tolerance of 0 merges only exact duplicates. Repeated consecutive
/// points in a cell are removed afterwards, and a polygon left with fewer
/// than three points (or a line with fewer than two) is dropped. Polygons
/// are fan-triangulated from their first point; line and vertex cells pass
/// through unchanged. Surviving points keep their original relative order.
///
/// # Errors
///
/// - [`TopologyError::EmptyMesh`] if the mesh has no points
/// - [`TopologyError::InvalidCell`] if a cell references a missing point
/// - [`TopologyError::InvalidTolerance`] if `tolerance` is negative or not finite
///
/// # Example
///
/// ```
/// use surface_topology::clean_mesh;
/// use surface_types::{Cell, Point3, SurfaceMesh};
///
/// // A quad stored as two separate triangles with a duplicated edge
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let cells = vec![Cell::from_slice(&[0, 1, 2]), Cell::from_slice(&[3, 4, 5])];
/// let mesh = SurfaceMesh::from_parts(points, cells);
///
/// let cleaned = clean_mesh(&mesh, 0.0).unwrap();
/// assert_eq!(cleaned.mesh.point_count(), 4);
/// assert_eq!(cleaned.merged_points, 2);
/// assert_eq!(cleaned.mesh.cell(1), Some(&[0, 2, 3][..]));
/// ```
pub fn clean_mesh(mesh: &SurfaceMesh, tolerance: f64) -> TopologyResult<CleanedMesh> {
    if mesh.is_empty() {
        return Err(TopologyError::EmptyMesh);
    }
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(TopologyError::InvalidTolerance);
    }
    if let Some(bad) = mesh.first_invalid_cell() {
        return Err(TopologyError::InvalidCell {
            cell: bad.cell,
            point: bad.point,
            point_count: mesh.point_count(),
        });
    }

    info!(
        points = mesh.point_count(),
        cells = mesh.cell_count(),
        tolerance = tolerance,
        "Cleaning mesh"
    );

    let representative = if tolerance > 0.0 {
        merge_within(&mesh.points, tolerance)
    } else {
        merge_exact(&mesh.points)
    };
    let merged_points = representative
        .iter()
        .enumerate()
        .filter(|&(i, &r)| r as usize != i)
        .count();

    // Collapse repeated corners, then drop what collapsed
    let mut dropped_cells = 0;
    let mut kept: Vec<Cell> = Vec::with_capacity(mesh.cell_count());
    for cell in &mesh.cells {
        let mut ids: Cell = Cell::new();
        for &p in cell {
            let r = representative[p as usize];
            if ids.last() != Some(&r) {
                ids.push(r);
            }
        }
        if ids.len() > 1 && ids.first() == ids.last() {
            ids.pop();
        }

        let minimum = cell.len().min(3);
        if ids.len() < minimum {
            dropped_cells += 1;
            continue;
        }
        kept.push(ids);
    }

    // Compact the used points, preserving their original order
    let mut used = vec![false; mesh.point_count()];
    for &p in kept.iter().flatten() {
        used[p as usize] = true;
    }
    let mut point_map: Vec<Option<u32>> = vec![None; mesh.point_count()];
    let mut points = Vec::new();
    for (i, point) in mesh.points.iter().enumerate() {
        if used[i] {
            #[allow(clippy::cast_possible_truncation)]
            let id = points.len() as u32;
            point_map[i] = Some(id);
            points.push(*point);
        }
    }
    for (i, &r) in representative.iter().enumerate() {
        if r as usize != i {
            point_map[i] = point_map[r as usize];
        }
    }

    let mut cells = Vec::with_capacity(kept.len());
    for ids in kept {
        let ids: Cell = ids.iter().filter_map(|&p| point_map[p as usize]).collect();
        if ids.len() <= 3 {
            cells.push(ids);
            continue;
        }
        for k in 1..ids.len() - 1 {
            cells.push(Cell::from_slice(&[ids[0], ids[k], ids[k + 1]]));
        }
    }

    debug!(
        merged = merged_points,
        dropped = dropped_cells,
        points = points.len(),
        cells = cells.len(),
        "Mesh cleaned"
    );

    Ok(CleanedMesh {
        mesh: SurfaceMesh::from_parts(points, cells),
        point_map,
        merged_points,
        dropped_cells,
    })
}

/// Bit pattern of a coordinate with `-0.0` folded onto `0.0`.
fn coordinate_key(p: &Point3<f64>) -> [u64; 3] {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// Lowest index of an exactly equal point, for every point.
fn merge_exact(points: &[Point3<f64>]) -> Vec<u32> {
    let mut first: HashMap<[u64; 3], u32> = HashMap::with_capacity(points.len());
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            #[allow(clippy::cast_possible_truncation)]
            let id = i as u32;
            *first.entry(coordinate_key(p)).or_insert(id)
        })
        .collect()
}

/// Lowest index of a point within `tolerance`, chained transitively.
#[allow(clippy::cast_possible_truncation)]
fn merge_within(points: &[Point3<f64>], tolerance: f64) -> Vec<u32> {
    let cell_size = tolerance * 2.0;
    let grid_cell = |p: &Point3<f64>| -> (i64, i64, i64) {
        (
            (p.x / cell_size).floor() as i64,
            (p.y / cell_size).floor() as i64,
            (p.z / cell_size).floor() as i64,
        )
    };

    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        grid.entry(grid_cell(p)).or_default().push(i as u32);
    }

    let mut representative: Vec<u32> = (0..points.len() as u32).collect();
    for (i, p) in points.iter().enumerate() {
        if representative[i] as usize != i {
            continue;
        }
        let (cx, cy, cz) = grid_cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        let o = other as usize;
                        if o > i
                            && representative[o] as usize == o
                            && (points[o] - p).norm() <= tolerance
                        {
                            representative[o] = i as u32;
                        }
                    }
                }
            }
        }
    }

    // Resolve chains
    for i in 0..representative.len() {
        let mut target = representative[i];
        while representative[target as usize] != target {
            target = representative[target as usize];
        }
        representative[i] = target;
    }
    representative
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{MeshAdjacency, RoiSpec, grow_region};
    use surface_types::uv_sphere;

    /// Two triangle strips sharing a seam whose points are duplicated.
    fn split_strip() -> SurfaceMesh {
        let mut points = Vec::new();
        for x in 0..3 {
            for y in 0..2 {
                points.push(Point3::new(f64::from(x), f64::from(y), 0.0));
            }
        }
        // Copies of the x = 2 seam, then the far column
        points.push(Point3::new(2.0, 0.0, 0.0));
        points.push(Point3::new(2.0, 1.0, 0.0));
        points.push(Point3::new(3.0, 0.0, 0.0));
        points.push(Point3::new(3.0, 1.0, 0.0));

        let cells = vec![
            Cell::from_slice(&[0, 2, 3, 1]),
            Cell::from_slice(&[2, 4, 5, 3]),
            Cell::from_slice(&[6, 8, 9, 7]),
        ];
        SurfaceMesh::from_parts(points, cells)
    }

    #[test]
    fn seam_merge_reconnects_regions() {
        let mesh = split_strip();
        let adj = MeshAdjacency::build(&mesh).unwrap();
        let before = grow_region(&adj, &RoiSpec::new().with_seed(0, 10)).unwrap();
        assert_eq!(before.len(), 6);

        let cleaned = clean_mesh(&mesh, 0.0).unwrap();
        assert_eq!(cleaned.merged_points, 2);
        assert_eq!(cleaned.mesh.point_count(), 8);
        assert_eq!(cleaned.point_map[6], cleaned.point_map[4]);
        assert_eq!(cleaned.point_map[7], cleaned.point_map[5]);

        let adj = MeshAdjacency::build(&cleaned.mesh).unwrap();
        let after = grow_region(&adj, &RoiSpec::new().with_seed(0, 10)).unwrap();
        assert_eq!(after.len(), 8);
    }

    #[test]
    fn quads_become_triangle_fans() {
        let cleaned = clean_mesh(&split_strip(), 0.0).unwrap();
        assert_eq!(cleaned.mesh.cell_count(), 6);
        assert!(cleaned.mesh.cells.iter().all(|c| c.len() == 3));
        assert_eq!(cleaned.mesh.cell(0), Some(&[0, 2, 3][..]));
        assert_eq!(cleaned.mesh.cell(1), Some(&[0, 3, 1][..]));
    }

    #[test]
    fn tolerance_merges_near_duplicates() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0005, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let cells = vec![Cell::from_slice(&[0, 1, 2]), Cell::from_slice(&[3, 4, 2])];
        let mesh = SurfaceMesh::from_parts(points, cells);

        assert_eq!(clean_mesh(&mesh, 0.0).unwrap().merged_points, 0);

        let cleaned = clean_mesh(&mesh, 0.001).unwrap();
        assert_eq!(cleaned.merged_points, 1);
        assert_eq!(cleaned.point_map[3], Some(1));
        assert_eq!(cleaned.mesh.cell(1), Some(&[1, 3, 2][..]));
    }

    #[test]
    fn collapsed_and_unused_are_dropped() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(9.0, 9.0, 9.0),
        ];
        // Second triangle collapses to an edge once 3 merges into 1
        let cells = vec![Cell::from_slice(&[0, 1, 2]), Cell::from_slice(&[0, 1, 3])];
        let mesh = SurfaceMesh::from_parts(points, cells);

        let cleaned = clean_mesh(&mesh, 0.0).unwrap();
        assert_eq!(cleaned.dropped_cells, 1);
        assert_eq!(cleaned.mesh.cell_count(), 1);
        assert_eq!(cleaned.mesh.point_count(), 3);
        assert_eq!(cleaned.point_map[4], None);
    }

    #[test]
    fn clean_sphere_is_unchanged() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let cleaned = clean_mesh(&sphere, 0.0).unwrap();
        assert_eq!(cleaned.mesh, sphere);
        assert_eq!(cleaned.merged_points, 0);
        assert_eq!(cleaned.dropped_cells, 0);
    }

    #[test]
    fn rejects_bad_input() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        assert_eq!(
            clean_mesh(&sphere, -1.0).unwrap_err(),
            TopologyError::InvalidTolerance
        );
        assert_eq!(
            clean_mesh(&sphere, f64::NAN).unwrap_err(),
            TopologyError::InvalidTolerance
        );
        assert_eq!(
            clean_mesh(&SurfaceMesh::new(), 0.0).unwrap_err(),
            TopologyError::EmptyMesh
        );

        let broken = SurfaceMesh::from_parts(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![Cell::from_slice(&[0, 1, 5])],
        );
        assert!(matches!(
            clean_mesh(&broken, 0.0).unwrap_err(),
            TopologyError::InvalidCell { cell: 0, point: 5, .. }
        ));
    }
}
