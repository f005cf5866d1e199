//! Mesh topology for region-of-interest registration.
//!
//! This crate provides the connectivity side of surface registration:
//!
//! - [`MeshAdjacency`] - Point → incident cells and cell → points lookups
//! - [`grow_region`] - Grow seed points outward by a number of cell hops
//! - [`extract_roi`] - Cut the grown region out as a standalone sub-mesh
//! - [`clean_mesh`] - Merge duplicate points and triangulate before growing
//!
//! # Layer 0 Crate
//!
//! Pure data in, pure data out. Meshes are borrowed and never modified;
//! cleaning returns a new mesh.
//!
//! # Hop Distance
//!
//! ROI radii count **cell-adjacency hops**, not Euclidean distance. One hop
//! from a point reaches every point of every cell incident to it, so quads
//! and polygons reach their diagonal corners in a single hop.
//!
//! # Example
//!
//! ```
//! use surface_topology::{extract_roi, RoiSpec};
//! use surface_types::{uv_sphere, Point3};
//!
//! let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
//!
//! let mut roi = RoiSpec::new();
//! roi.insert(9, 1);
//!
//! let extraction = extract_roi(&sphere, &roi).unwrap();
//! assert_eq!(extraction.region.sorted_points(), vec![2, 3, 8, 9, 10, 15, 16]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod adjacency;
mod clean;
mod error;
mod extract;
mod grow;

pub use adjacency::MeshAdjacency;
pub use clean::{CleanedMesh, clean_mesh};
pub use error::{TopologyError, TopologyResult};
pub use extract::{RoiExtraction, extract_roi};
pub use grow::{GrownRegion, RoiSpec, grow_region};
