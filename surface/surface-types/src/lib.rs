//! Core surface types for surface-align.
//!
//! This crate provides the value types shared by the registration core:
//!
//! - [`SurfaceMesh`] - Point positions plus polygonal cell connectivity
//! - [`Cell`] - One polygonal cell as an ordered list of point indices
//! - [`PointSet`] - Ordered positions without connectivity (landmarks, ICP samples)
//! - [`uv_sphere`] - Latitude/longitude sphere tessellation used as a fixture
//!
//! # Layer 0 Crate
//!
//! No GUI, scene graph or file format dependencies. Callers extract points and
//! cells from whatever host they live in and hand them over by value or by
//! reference.
//!
//! # Units
//!
//! This library is **unit-agnostic**. All coordinates are `f64`.
//!
//! # Example
//!
//! ```
//! use surface_types::{Point3, SurfaceMesh};
//!
//! let mesh = SurfaceMesh::from_triangles(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     &[[0, 1, 2]],
//! );
//!
//! assert_eq!(mesh.point_count(), 3);
//! assert_eq!(mesh.cell_count(), 1);
//! assert!(mesh.first_invalid_cell().is_none());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod mesh;
mod points;

pub use mesh::{Cell, InvalidCell, SurfaceMesh, uv_sphere};
pub use points::{PointSet, centroid, finite_point};

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
