//! Surface registration toolkit.
//!
//! This umbrella crate re-exports the surface-* crates behind one API for
//! aligning a moving surface mesh onto a fixed one.
//!
//! # Quick Start
//!
//! ```
//! use surface_align::prelude::*;
//!
//! let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
//! let mut moving = fixed.clone();
//! moving.translate(Vector3::new(0.0, 5.0, 0.0));
//!
//! let params = RegistrationParams::default().with_check_every_iteration(true);
//! let result = register_surfaces(&fixed, &moving, &params).unwrap();
//! let aligned = transform_mesh(&moving, &result.transform);
//!
//! assert!(result.converged());
//! assert!((aligned.points[0] - fixed.points[0]).norm() < 1e-6);
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - `SurfaceMesh`, cells, point sets and the UV sphere generator
//! - [`topology`] - Cell adjacency, mesh cleaning, ROI region growing and sub-mesh extraction
//! - [`registration`] - ICP, landmark solver, closest-point index and transforms
//!
//! # Feature Flags
//!
//! - `parallel` (default) - rayon-backed batch closest-point queries
//! - `serde` - serialization for meshes, ROIs, parameters and transforms

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Core data structures: `SurfaceMesh`, `Cell`, point helpers.
pub use surface_types as types;

/// Adjacency, region growing and ROI extraction.
pub use surface_topology as topology;

/// ICP, landmark and ROI registration.
pub use surface_registration as registration;

/// Common imports for surface registration.
///
/// ```
/// use surface_align::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use surface_types::{Point3, SurfaceMesh, Vector3, uv_sphere};

    // Topology
    pub use surface_topology::{RoiSpec, clean_mesh, extract_roi, grow_region};

    // Registration
    pub use surface_registration::{
        ClosestPointIndex, IcpEngine, IcpResult, IcpState, LandmarkSet, LandmarkTransformMode,
        MeanDistanceMode, RegistrationError, RegistrationParams, Transform, icp_align,
        paired_positions, register_landmarks, register_roi, register_roi_from_landmarks,
        register_surfaces, solve_landmark_transform, transform_mesh,
    };
}
