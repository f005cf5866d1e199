//! Iterative Closest Point (ICP) algorithm for surface registration.
//!
//! ICP iteratively refines the alignment of a moving surface onto a fixed
//! surface by:
//! 1. Pairing sampled moving points with their closest fixed vertices
//! 2. Fitting the best transform for those pairs
//! 3. Applying it and repeating until the pairs are close enough
//!
//! Closest vertices come from a k-d tree built once over the fixed surface.

use nalgebra::Point3;
use surface_types::{SurfaceMesh, centroid, finite_point};
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::closest::ClosestPointIndex;
use crate::error::{RegistrationError, RegistrationResult};
use crate::params::RegistrationParams;
use crate::solver::{LandmarkTransformMode, solve_landmark_transform};
use crate::transform::Transform;

/// Fraction of the convergence threshold below which an iteration counts as
/// not having moved anything.
const STATIONARY_FRACTION: f64 = 1e-6;

/// Minimum number of samples for similarity and affine fits.
const MIN_NON_RIGID_SAMPLES: usize = 3;

/// Lifecycle of an ICP run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IcpState {
    /// Created, not yet run.
    #[default]
    Initialized,
    /// Inside the iteration loop.
    Iterating,
    /// Mean distance fell to or below the threshold.
    Converged,
    /// Iteration budget exhausted without meeting the threshold.
    IterationLimitReached,
}

impl IcpState {
    /// True for [`IcpState::Converged`] and [`IcpState::IterationLimitReached`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::IterationLimitReached)
    }
}

/// Result of an ICP run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IcpResult {
    /// Accumulated transform mapping the moving surface onto the fixed one.
    pub transform: Transform,
    /// Terminal state of the run.
    pub state: IcpState,
    /// Number of iterations performed.
    pub iterations: u32,
    /// Last evaluated mean distance between moved samples and their closest
    /// fixed vertices.
    pub mean_distance: Option<f64>,
    /// Number of moving points sampled per iteration.
    pub landmark_count: usize,
    /// Transform class actually fitted (rigid when too few samples).
    pub mode_used: LandmarkTransformMode,
}

impl IcpResult {
    /// True when the run met the distance threshold.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.state == IcpState::Converged
    }
}

/// Stateful ICP driver.
///
/// The engine owns its parameters and reports its state between runs. Each
/// run works on private copies of the sampled points; the input surfaces are
/// only borrowed.
///
/// # Example
///
/// ```
/// use surface_registration::{IcpEngine, IcpState, RegistrationParams};
/// use surface_types::{uv_sphere, Point3};
///
/// let fixed = uv_sphere(Point3::origin(), 10.0, 8, 8);
/// let moving = fixed.clone();
///
/// let mut engine = IcpEngine::new(RegistrationParams::default());
/// assert_eq!(engine.state(), IcpState::Initialized);
///
/// let result = engine.run(&fixed, &moving).unwrap();
/// assert_eq!(engine.state(), IcpState::Converged);
/// assert_eq!(result.iterations, 1);
/// assert!(result.transform.is_identity(1e-9));
/// ```
#[derive(Debug, Clone)]
pub struct IcpEngine {
    params: RegistrationParams,
    state: IcpState,
}

impl IcpEngine {
    /// Create an engine with the given parameters.
    #[must_use]
    pub const fn new(params: RegistrationParams) -> Self {
        Self {
            params,
            state: IcpState::Initialized,
        }
    }

    /// The parameters used for every run.
    #[must_use]
    pub const fn params(&self) -> &RegistrationParams {
        &self.params
    }

    /// State after the most recent run.
    #[must_use]
    pub const fn state(&self) -> IcpState {
        self.state
    }

    /// Register `moving` onto `fixed`.
    ///
    /// # Errors
    ///
    /// See [`IcpEngine::run_points`].
    pub fn run(&mut self, fixed: &SurfaceMesh, moving: &SurfaceMesh) -> RegistrationResult<IcpResult> {
        self.run_points(&fixed.points, &moving.points)
    }

    /// Register a moving point set onto a fixed point set.
    ///
    /// Cells play no part in ICP, so bare point clouds work as well as meshes.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::InvalidParameter`] if the parameters fail
    ///   [`RegistrationParams::validate`]
    /// - [`RegistrationError::EmptyFixed`] / [`RegistrationError::EmptyMoving`]
    ///   if either set has no points
    /// - [`RegistrationError::NonFinitePoint`] if any point is NaN or infinite
    /// - Solver errors from [`solve_landmark_transform`]
    ///
    /// On error the engine returns to [`IcpState::Initialized`].
    pub fn run_points(
        &mut self,
        fixed: &[Point3<f64>],
        moving: &[Point3<f64>],
    ) -> RegistrationResult<IcpResult> {
        self.state = IcpState::Initialized;
        let outcome = self.iterate(fixed, moving);
        if outcome.is_err() {
            self.state = IcpState::Initialized;
        }
        outcome
    }

    fn iterate(
        &mut self,
        fixed: &[Point3<f64>],
        moving: &[Point3<f64>],
    ) -> RegistrationResult<IcpResult> {
        let params = &self.params;
        params.validate()?;

        if fixed.is_empty() {
            return Err(RegistrationError::EmptyFixed);
        }
        if moving.is_empty() {
            return Err(RegistrationError::EmptyMoving);
        }
        if let Some(index) = moving.iter().position(|p| !finite_point(p)) {
            return Err(RegistrationError::NonFinitePoint { index });
        }

        let index = ClosestPointIndex::build(fixed)?;

        let mut accumulated = Transform::identity();
        if params.match_centroids_on_start {
            if let (Some(f), Some(m)) = (centroid(fixed), centroid(moving)) {
                accumulated = Transform::from_translation(f - m);
            }
        }

        let step = sample_stride(moving.len(), params.max_landmarks);
        let mut samples: Vec<Point3<f64>> = moving
            .iter()
            .step_by(step)
            .take(params.max_landmarks)
            .map(|p| accumulated.transform_point(p))
            .collect();

        let mut mode = params.landmark_transform_mode;
        if samples.len() < MIN_NON_RIGID_SAMPLES && mode != LandmarkTransformMode::RigidBody {
            warn!(
                samples = samples.len(),
                requested = %mode,
                "Too few samples for the requested transform, using rigid body"
            );
            mode = LandmarkTransformMode::RigidBody;
        }

        info!(
            fixed_points = fixed.len(),
            moving_points = moving.len(),
            samples = samples.len(),
            mode = %mode,
            max_iterations = params.max_iterations,
            "Starting ICP registration"
        );

        self.state = IcpState::Iterating;

        let stationary_sq = (params.max_mean_distance * STATIONARY_FRACTION).powi(2);
        let mut state = IcpState::IterationLimitReached;
        let mut iterations = 0;
        let mut mean_distance = None;

        for iteration in 1..=params.max_iterations {
            iterations = iteration;

            let targets: Vec<Point3<f64>> = index
                .nearest_many(&samples)
                .iter()
                .map(|n| index.points()[n.index])
                .collect();

            let increment = solve_landmark_transform(&samples, &targets, mode)?;

            let mut max_step_sq: f64 = 0.0;
            for sample in &mut samples {
                let moved = increment.transform_point(sample);
                max_step_sq = max_step_sq.max((moved - *sample).norm_squared());
                *sample = moved;
            }
            accumulated = increment.compose(&accumulated);

            let stationary = max_step_sq <= stationary_sq;
            let evaluate = params.check_mean_distance_every_iteration
                || stationary
                || iteration == params.max_iterations;

            debug!(
                iteration = iteration,
                max_step = max_step_sq.sqrt(),
                "ICP iteration"
            );

            if evaluate {
                let distance = params.mean_distance_mode.reduce(
                    samples
                        .iter()
                        .zip(&targets)
                        .map(|(s, t)| (s - t).norm_squared()),
                );
                mean_distance = distance;

                debug!(iteration = iteration, mean_distance = ?distance, "ICP distance check");

                if distance.is_some_and(|d| d <= params.max_mean_distance) {
                    state = IcpState::Converged;
                    break;
                }
            }
        }

        self.state = state;

        info!(
            state = ?state,
            iterations = iterations,
            mean_distance = ?mean_distance,
            "ICP registration finished"
        );

        Ok(IcpResult {
            transform: accumulated,
            state,
            iterations,
            mean_distance,
            landmark_count: samples.len(),
            mode_used: mode,
        })
    }
}

/// Align `moving` onto `fixed` with ICP.
///
/// Convenience wrapper around [`IcpEngine`] for one-shot runs.
///
/// # Errors
///
/// See [`IcpEngine::run_points`].
///
/// # Example
///
/// ```
/// use surface_registration::{icp_align, RegistrationParams};
/// use surface_types::{uv_sphere, Point3, Vector3};
///
/// let fixed = uv_sphere(Point3::origin(), 100.0, 8, 8);
/// let mut moving = fixed.clone();
/// moving.translate(Vector3::new(5.0, 0.0, 0.0));
///
/// let params = RegistrationParams::default().with_check_every_iteration(true);
/// let result = icp_align(&fixed, &moving, &params).unwrap();
///
/// assert!(result.converged());
/// assert!((result.transform.translation() - Vector3::new(-5.0, 0.0, 0.0)).norm() < 1e-6);
/// ```
pub fn icp_align(
    fixed: &SurfaceMesh,
    moving: &SurfaceMesh,
    params: &RegistrationParams,
) -> RegistrationResult<IcpResult> {
    IcpEngine::new(params.clone()).run(fixed, moving)
}

/// Stride that keeps at most `max_samples` evenly spaced points out of
/// `point_count`.
fn sample_stride(point_count: usize, max_samples: usize) -> usize {
    point_count.div_ceil(max_samples.max(1)).max(1)
}
