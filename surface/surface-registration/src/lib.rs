//! Surface mesh registration.
//!
//! This crate aligns a moving surface onto a fixed surface:
//! - **ICP** - Iterative closest point over a bounded sample of moving points
//! - **Landmark solver** - Rigid, similarity or affine fit from paired points
//! - **ROI registration** - ICP restricted to regions grown around seed points
//! - **Closest-point index** - Nearest fixed point lookup backed by a KD-tree
//!
//! # Layer 0
//!
//! No rendering or UI dependencies. Meshes come in by reference and are never
//! modified; every result is a fresh [`Transform`] mapping moving coordinates
//! into fixed coordinates.
//!
//! # Quick Start
//!
//! ## ICP Registration
//!
//! ```
//! use surface_registration::{icp_align, RegistrationParams};
//! use surface_types::{uv_sphere, Point3, Vector3};
//!
//! let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
//! let mut moving = fixed.clone();
//! moving.translate(Vector3::new(3.0, 0.0, 0.0));
//!
//! let result = icp_align(&fixed, &moving, &RegistrationParams::default()).unwrap();
//!
//! assert!(result.converged());
//! assert!((result.transform.translation().x + 3.0).abs() < 1e-6);
//! ```
//!
//! ## Landmark Registration
//!
//! ```
//! use surface_registration::{
//!     paired_positions, register_landmarks, LandmarkSet, LandmarkTransformMode,
//! };
//! use nalgebra::Point3;
//!
//! let mut fixed = LandmarkSet::new();
//! fixed.add("nasion", Point3::new(0.0, 0.0, 0.0));
//! fixed.add("left ear", Point3::new(-10.0, -5.0, 0.0));
//! fixed.add("right ear", Point3::new(10.0, -5.0, 0.0));
//!
//! let mut moving = LandmarkSet::new();
//! moving.add("nasion", Point3::new(1.0, 0.0, 0.0));
//! moving.add("left ear", Point3::new(-9.0, -5.0, 0.0));
//! moving.add("right ear", Point3::new(11.0, -5.0, 0.0));
//!
//! let pairs = paired_positions(&fixed, &moving);
//! let fit = register_landmarks(&pairs.fixed, &pairs.moving, LandmarkTransformMode::RigidBody)
//!     .unwrap();
//! assert!((fit.transform.translation().x + 1.0).abs() < 1e-9);
//! ```
//!
//! # Modes
//!
//! | Mode | Degrees of freedom | Minimum pairs |
//! |------|--------------------|---------------|
//! | [`LandmarkTransformMode::RigidBody`] | rotation + translation | 1 |
//! | [`LandmarkTransformMode::Similarity`] | + uniform scale | 3 for scale |
//! | [`LandmarkTransformMode::Affine`] | full 3×3 linear part | 4 for a unique fit |
//!
//! # Features
//!
//! - `parallel` (default) - batch closest-point queries run on rayon
//! - `serde` - serialization for transforms, parameters and landmarks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod closest;
mod error;
mod icp;
mod landmarks;
mod params;
mod roi;
mod solver;
mod transform;
mod workflow;

pub use closest::{ClosestPointIndex, Nearest};
pub use error::{ErrorKind, RegistrationError, RegistrationResult};
pub use icp::{IcpEngine, IcpResult, IcpState, icp_align};
pub use landmarks::{
    LandmarkId, LandmarkPairs, LandmarkRegistration, LandmarkSet, LandmarkState,
    paired_positions, register_landmarks,
};
pub use params::{MeanDistanceMode, RegistrationParams};
pub use roi::{register_roi, register_roi_from_landmarks};
pub use solver::{LandmarkTransformMode, solve_landmark_transform};
pub use transform::Transform;
pub use workflow::{mean_distance, register_surfaces, transform_mesh};
