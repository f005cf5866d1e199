//! Sub-mesh extraction for a region of interest.

use hashbrown::HashMap;
use surface_types::{Cell, SurfaceMesh};
use tracing::info;

use crate::adjacency::MeshAdjacency;
use crate::error::{TopologyError, TopologyResult};
use crate::grow::{GrownRegion, RoiSpec, grow_region};

/// A sub-mesh cut out of a larger mesh, with maps back to the original IDs.
#[derive(Debug, Clone)]
pub struct RoiExtraction {
    /// The extracted mesh with compact point and cell numbering.
    pub mesh: SurfaceMesh,

    /// For each point of `mesh`, its ID in the original mesh.
    pub point_map: Vec<u32>,

    /// For each cell of `mesh`, its ID in the original mesh.
    pub cell_map: Vec<u32>,

    /// The grown point set the extraction was cut from.
    pub region: GrownRegion,
}

/// Extract the cells lying entirely inside a grown region of interest.
///
/// The ROI is grown with [`grow_region`], then every cell whose points are
/// all in the grown set is kept. Cells are kept in original order and points
/// are renumbered by first appearance while walking the kept cells. Points of
/// the region that belong to no kept cell are not part of the output mesh.
///
/// The input mesh is not modified.
///
/// # Errors
///
/// - [`TopologyError::EmptyMesh`] if the mesh has no points
/// - [`TopologyError::EmptyRoi`] if the ROI has no seeds
/// - [`TopologyError::SeedOutOfBounds`] if a seed is not a mesh point
/// - [`TopologyError::InvalidCell`] if a cell references a missing point
///
/// # Example
///
/// ```
/// use surface_topology::{extract_roi, RoiSpec};
/// use surface_types::{uv_sphere, Point3};
///
/// let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
/// let roi = extract_roi(&sphere, &RoiSpec::new().with_seed(0, 2)).unwrap();
///
/// // The whole north cap plus the first band
/// assert_eq!(roi.mesh.cell_count(), 24);
/// assert_eq!(roi.point_map[0], 2);
/// ```
pub fn extract_roi(mesh: &SurfaceMesh, roi: &RoiSpec) -> TopologyResult<RoiExtraction> {
    if mesh.is_empty() {
        return Err(TopologyError::EmptyMesh);
    }
    if roi.is_empty() {
        return Err(TopologyError::EmptyRoi);
    }

    info!(
        points = mesh.point_count(),
        cells = mesh.cell_count(),
        seeds = roi.len(),
        max_radius = roi.max_radius(),
        "Extracting ROI"
    );

    let adjacency = MeshAdjacency::build(mesh)?;
    let region = grow_region(&adjacency, roi)?;

    let mut remap: HashMap<u32, u32> = HashMap::with_capacity(region.len());
    let mut sub = SurfaceMesh::new();
    let mut point_map = Vec::new();
    let mut cell_map = Vec::new();

    for (cell_idx, cell) in mesh.cells.iter().enumerate() {
        if cell.is_empty() || !cell.iter().all(|&p| region.contains(p)) {
            continue;
        }

        let new_cell: Cell = cell
            .iter()
            .map(|&p| {
                *remap.entry(p).or_insert_with(|| {
                    let id = u32::try_from(sub.points.len()).unwrap_or(u32::MAX);
                    sub.points.push(mesh.points[p as usize]);
                    point_map.push(p);
                    id
                })
            })
            .collect();

        sub.cells.push(new_cell);
        cell_map.push(u32::try_from(cell_idx).unwrap_or(u32::MAX));
    }

    info!(
        region_points = region.len(),
        points = sub.point_count(),
        cells = sub.cell_count(),
        "ROI extracted"
    );

    Ok(RoiExtraction {
        mesh: sub,
        point_map,
        cell_map,
        region,
    })
}
