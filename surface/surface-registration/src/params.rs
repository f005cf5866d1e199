//! Registration parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, RegistrationResult};
use crate::solver::LandmarkTransformMode;

/// How per-point distances are reduced to one convergence number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MeanDistanceMode {
    /// Arithmetic mean of the distances.
    AbsoluteValue,
    /// Square root of the mean squared distance.
    #[default]
    Rms,
}

impl MeanDistanceMode {
    /// Reduce squared distances to a single mean distance.
    ///
    /// Returns `None` for an empty input.
    ///
    /// # Example
    ///
    /// ```
    /// use surface_registration::MeanDistanceMode;
    ///
    /// let squared = [9.0, 16.0];
    /// assert_eq!(MeanDistanceMode::AbsoluteValue.reduce(squared), Some(3.5));
    /// assert!((MeanDistanceMode::Rms.reduce(squared).unwrap() - 12.5_f64.sqrt()).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn reduce(self, squared_distances: impl IntoIterator<Item = f64>) -> Option<f64> {
        let mut count = 0_usize;
        let mut total = 0.0;
        for d2 in squared_distances {
            count += 1;
            total += match self {
                Self::AbsoluteValue => d2.sqrt(),
                Self::Rms => d2,
            };
        }
        if count == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = total / count as f64;
        Some(match self {
            Self::AbsoluteValue => mean,
            Self::Rms => mean.sqrt(),
        })
    }
}

/// Parameters for ICP surface registration.
///
/// Defaults match the long-standing behaviour of the host application:
/// rigid-body fitting, RMS distance, 50 iterations, a 0.01 distance
/// threshold and at most 200 sampled points per iteration.
///
/// # Example
///
/// ```
/// use surface_registration::{LandmarkTransformMode, MeanDistanceMode, RegistrationParams};
///
/// let params = RegistrationParams::new()
///     .with_mode(LandmarkTransformMode::Similarity)
///     .with_mean_distance_mode(MeanDistanceMode::AbsoluteValue)
///     .with_max_iterations(200)
///     .with_match_centroids_on_start(true);
///
/// assert!(params.validate().is_ok());
/// assert_eq!(params.max_landmarks, 200);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[allow(clippy::struct_excessive_bools)]
pub struct RegistrationParams {
    /// Class of transform fitted on each iteration (default: rigid body).
    pub landmark_transform_mode: LandmarkTransformMode,
    /// Reduction used for the convergence distance (default: RMS).
    pub mean_distance_mode: MeanDistanceMode,
    /// Iteration budget, at least 1 (default: 50).
    pub max_iterations: u32,
    /// Convergence threshold on the mean distance (default: 0.01).
    pub max_mean_distance: f64,
    /// Maximum number of moving points sampled per iteration (default: 200).
    pub max_landmarks: usize,
    /// Translate the moving centroid onto the fixed centroid before
    /// iterating (default: false).
    pub match_centroids_on_start: bool,
    /// Evaluate the mean distance after every iteration instead of only at
    /// the end (default: false).
    pub check_mean_distance_every_iteration: bool,
}

impl Default for RegistrationParams {
    fn default() -> Self {
        Self {
            landmark_transform_mode: LandmarkTransformMode::RigidBody,
            mean_distance_mode: MeanDistanceMode::Rms,
            max_iterations: 50,
            max_mean_distance: 0.01,
            max_landmarks: 200,
            match_centroids_on_start: false,
            check_mean_distance_every_iteration: false,
        }
    }
}

impl RegistrationParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transform class fitted on each iteration.
    #[must_use]
    pub const fn with_mode(mut self, mode: LandmarkTransformMode) -> Self {
        self.landmark_transform_mode = mode;
        self
    }

    /// Sets the mean distance reduction.
    #[must_use]
    pub const fn with_mean_distance_mode(mut self, mode: MeanDistanceMode) -> Self {
        self.mean_distance_mode = mode;
        self
    }

    /// Sets the iteration budget.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence threshold.
    #[must_use]
    pub const fn with_max_mean_distance(mut self, distance: f64) -> Self {
        self.max_mean_distance = distance;
        self
    }

    /// Sets the per-iteration sample cap.
    #[must_use]
    pub const fn with_max_landmarks(mut self, max_landmarks: usize) -> Self {
        self.max_landmarks = max_landmarks;
        self
    }

    /// Enables or disables the initial centroid match.
    #[must_use]
    pub const fn with_match_centroids_on_start(mut self, enabled: bool) -> Self {
        self.match_centroids_on_start = enabled;
        self
    }

    /// Enables or disables the per-iteration distance check.
    #[must_use]
    pub const fn with_check_every_iteration(mut self, enabled: bool) -> Self {
        self.check_mean_distance_every_iteration = enabled;
        self
    }

    /// Checks that every numeric parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidParameter`] if `max_iterations` or
    /// `max_landmarks` is zero, or `max_mean_distance` is not a positive
    /// finite number.
    pub fn validate(&self) -> RegistrationResult<()> {
        if self.max_iterations < 1 {
            return Err(RegistrationError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.max_mean_distance.is_finite() || self.max_mean_distance <= 0.0 {
            return Err(RegistrationError::InvalidParameter(format!(
                "max_mean_distance must be positive and finite, got {}",
                self.max_mean_distance
            )));
        }
        if self.max_landmarks < 1 {
            return Err(RegistrationError::InvalidParameter(
                "max_landmarks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
