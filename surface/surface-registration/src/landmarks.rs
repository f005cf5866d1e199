//! Named landmark bookkeeping and landmark-based registration.
//!
//! A [`LandmarkSet`] holds the labelled points placed on one surface. Sets
//! from two surfaces are paired by label and fed to
//! [`solve_landmark_transform`] for an initial alignment, and their ROI radii
//! seed region-restricted ICP.

use std::fmt;

use nalgebra::Point3;
use surface_topology::RoiSpec;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::closest::ClosestPointIndex;
use crate::error::{RegistrationError, RegistrationResult};
use crate::params::MeanDistanceMode;
use crate::solver::{LandmarkTransformMode, solve_landmark_transform};
use crate::transform::Transform;

/// Handle to a landmark inside a [`LandmarkSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LandmarkId(usize);

impl LandmarkId {
    /// Position of the landmark in its set.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One labelled landmark.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LandmarkState {
    /// Label used to pair landmarks across surfaces.
    pub label: String,
    /// Current position.
    pub position: Point3<f64>,
    /// Surface vertex the landmark was snapped to, if projected and not
    /// moved since.
    pub projected_point: Option<u32>,
    /// ROI radius in cell hops around the projected vertex; 0 adds no ROI.
    pub roi_radius: u32,
    /// Parents of a midpoint landmark.
    pub midpoint_of: Option<(LandmarkId, LandmarkId)>,
}

impl LandmarkState {
    fn new(label: String, position: Point3<f64>) -> Self {
        Self {
            label,
            position,
            projected_point: None,
            roi_radius: 0,
            midpoint_of: None,
        }
    }

    /// True for landmarks defined as the midpoint of two others.
    #[must_use]
    pub const fn is_midpoint(&self) -> bool {
        self.midpoint_of.is_some()
    }
}

/// Ordered collection of landmarks on one surface.
///
/// # Example
///
/// ```
/// use surface_registration::LandmarkSet;
/// use nalgebra::Point3;
///
/// let mut set = LandmarkSet::new();
/// let nose = set.add("nose", Point3::new(0.0, 0.0, 0.0));
/// let chin = set.add("chin", Point3::new(0.0, -4.0, 0.0));
/// let mid = set.add_midpoint("mid", nose, chin).unwrap();
///
/// set.set_position(chin, Point3::new(0.0, -8.0, 0.0)).unwrap();
/// assert_eq!(set.get(mid).unwrap().position, Point3::new(0.0, -4.0, 0.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LandmarkSet {
    landmarks: Vec<LandmarkState>,
}

impl LandmarkSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            landmarks: Vec::new(),
        }
    }

    /// Number of landmarks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// True when the set has no landmarks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Add a landmark at a position.
    pub fn add(&mut self, label: impl Into<String>, position: Point3<f64>) -> LandmarkId {
        let id = LandmarkId(self.landmarks.len());
        self.landmarks.push(LandmarkState::new(label.into(), position));
        id
    }

    /// Add a landmark that stays halfway between two existing landmarks.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownLandmark`] if either parent does
    /// not exist.
    pub fn add_midpoint(
        &mut self,
        label: impl Into<String>,
        a: LandmarkId,
        b: LandmarkId,
    ) -> RegistrationResult<LandmarkId> {
        let position = self.midpoint(a, b)?;
        let id = self.add(label, position);
        self.landmarks[id.0].midpoint_of = Some((a, b));
        Ok(id)
    }

    /// Get a landmark.
    #[must_use]
    pub fn get(&self, id: LandmarkId) -> Option<&LandmarkState> {
        self.landmarks.get(id.0)
    }

    /// Find the first landmark with a label.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<LandmarkId> {
        self.landmarks
            .iter()
            .position(|l| l.label == label)
            .map(LandmarkId)
    }

    /// Iterate over landmarks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (LandmarkId, &LandmarkState)> {
        self.landmarks
            .iter()
            .enumerate()
            .map(|(i, l)| (LandmarkId(i), l))
    }

    /// Current positions in insertion order.
    #[must_use]
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.landmarks.iter().map(|l| l.position).collect()
    }

    /// Move a landmark. Midpoints that depend on it follow, recursively.
    ///
    /// Moving a landmark clears its surface projection. Setting the position
    /// of a midpoint detaches it from its parents.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownLandmark`] if `id` does not exist.
    pub fn set_position(&mut self, id: LandmarkId, position: Point3<f64>) -> RegistrationResult<()> {
        let landmark = self
            .landmarks
            .get_mut(id.0)
            .ok_or(RegistrationError::UnknownLandmark(id.0))?;
        landmark.position = position;
        landmark.projected_point = None;
        landmark.midpoint_of = None;
        self.refresh_midpoints_after(id);
        Ok(())
    }

    /// Set the ROI radius of a landmark.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownLandmark`] if `id` does not exist.
    pub fn set_roi_radius(&mut self, id: LandmarkId, radius: u32) -> RegistrationResult<()> {
        let landmark = self
            .landmarks
            .get_mut(id.0)
            .ok_or(RegistrationError::UnknownLandmark(id.0))?;
        landmark.roi_radius = radius;
        Ok(())
    }

    /// Snap every landmark onto its closest surface vertex.
    ///
    /// Midpoints are first recomputed from their (already snapped) parents and
    /// then snapped themselves.
    pub fn project(&mut self, surface: &ClosestPointIndex) {
        for i in 0..self.landmarks.len() {
            if let Some((a, b)) = self.landmarks[i].midpoint_of {
                if let Ok(position) = self.midpoint(a, b) {
                    self.landmarks[i].position = position;
                }
            }

            let nearest = surface.query(&self.landmarks[i].position);
            let landmark = &mut self.landmarks[i];
            landmark.position = surface.points()[nearest];
            landmark.projected_point = u32::try_from(nearest).ok();
        }
    }

    /// ROI seeds from every landmark with a positive radius.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnprojectedLandmark`] if a landmark with a
    /// radius has not been projected onto the surface.
    pub fn roi_spec(&self) -> RegistrationResult<RoiSpec> {
        let mut roi = RoiSpec::new();
        for landmark in self.landmarks.iter().filter(|l| l.roi_radius > 0) {
            let seed = landmark
                .projected_point
                .ok_or_else(|| RegistrationError::UnprojectedLandmark {
                    label: landmark.label.clone(),
                })?;
            roi.insert(seed, landmark.roi_radius);
        }
        Ok(roi)
    }

    fn midpoint(&self, a: LandmarkId, b: LandmarkId) -> RegistrationResult<Point3<f64>> {
        let pa = self.get(a).ok_or(RegistrationError::UnknownLandmark(a.0))?;
        let pb = self.get(b).ok_or(RegistrationError::UnknownLandmark(b.0))?;
        Ok(nalgebra::center(&pa.position, &pb.position))
    }

    /// Recompute midpoints downstream of `changed`.
    ///
    /// Parents always precede their midpoints, so one forward pass reaches
    /// every dependent.
    fn refresh_midpoints_after(&mut self, changed: LandmarkId) {
        let mut dirty = vec![false; self.landmarks.len()];
        if let Some(flag) = dirty.get_mut(changed.0) {
            *flag = true;
        }

        for i in changed.0 + 1..self.landmarks.len() {
            let Some((a, b)) = self.landmarks[i].midpoint_of else {
                continue;
            };
            // Parents can be out of range in a set loaded from disk
            let is_dirty = |id: LandmarkId| dirty.get(id.0).copied().unwrap_or(false);
            if !(is_dirty(a) || is_dirty(b)) {
                continue;
            }
            if let Ok(position) = self.midpoint(a, b) {
                let landmark = &mut self.landmarks[i];
                landmark.position = position;
                landmark.projected_point = None;
                dirty[i] = true;
            }
        }
    }
}

/// Positions of landmarks present in both sets, matched by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkPairs {
    /// Labels of the matched landmarks, in fixed-set order.
    pub labels: Vec<String>,
    /// Positions on the fixed surface.
    pub fixed: Vec<Point3<f64>>,
    /// Positions on the moving surface.
    pub moving: Vec<Point3<f64>>,
}

impl LandmarkPairs {
    /// Number of matched pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when no label matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Pair the landmarks of two sets by label.
///
/// Pairs follow the order of `fixed`. Labels present in only one set are
/// skipped.
#[must_use]
pub fn paired_positions(fixed: &LandmarkSet, moving: &LandmarkSet) -> LandmarkPairs {
    let mut pairs = LandmarkPairs::default();
    for (_, landmark) in fixed.iter() {
        match moving
            .find_by_label(&landmark.label)
            .and_then(|id| moving.get(id))
        {
            Some(other) => {
                pairs.labels.push(landmark.label.clone());
                pairs.fixed.push(landmark.position);
                pairs.moving.push(other.position);
            }
            None => debug!(label = %landmark.label, "Landmark has no counterpart, skipping"),
        }
    }
    pairs
}

/// Result of a landmark registration.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkRegistration {
    /// Transform mapping the moving landmarks onto the fixed ones.
    pub transform: Transform,
    /// Transform class actually fitted.
    pub mode_used: LandmarkTransformMode,
    /// Root-mean-square distance between moved and fixed landmarks.
    pub rms_error: f64,
}

/// Fit a transform taking `moving` landmarks onto `fixed` landmarks.
///
/// With fewer than three pairs only a rigid fit is attempted, whatever mode
/// was requested.
///
/// # Errors
///
/// - [`RegistrationError::MismatchedCorrespondences`] if the counts differ
/// - [`RegistrationError::NoCorrespondences`] if there are no pairs
///
/// # Example
///
/// ```
/// use surface_registration::{register_landmarks, LandmarkTransformMode};
/// use nalgebra::{Point3, Vector3};
///
/// let moving = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let fixed: Vec<_> = moving.iter().map(|p| p + Vector3::new(2.0, 0.0, 0.0)).collect();
///
/// let reg = register_landmarks(&fixed, &moving, LandmarkTransformMode::Similarity).unwrap();
/// assert!(reg.rms_error < 1e-9);
/// ```
pub fn register_landmarks(
    fixed: &[Point3<f64>],
    moving: &[Point3<f64>],
    mode: LandmarkTransformMode,
) -> RegistrationResult<LandmarkRegistration> {
    if fixed.len() != moving.len() {
        return Err(RegistrationError::MismatchedCorrespondences {
            source_len: moving.len(),
            target_len: fixed.len(),
        });
    }

    let mode_used = if moving.len() < 3 && mode != LandmarkTransformMode::RigidBody {
        warn!(
            pairs = moving.len(),
            requested = %mode,
            "Fewer than 3 landmark pairs, using rigid body"
        );
        LandmarkTransformMode::RigidBody
    } else {
        mode
    };

    let transform = solve_landmark_transform(moving, fixed, mode_used)?;
    let rms_error = MeanDistanceMode::Rms
        .reduce(
            moving
                .iter()
                .zip(fixed)
                .map(|(m, f)| (transform.transform_point(m) - f).norm_squared()),
        )
        .unwrap_or(0.0);

    Ok(LandmarkRegistration {
        transform,
        mode_used,
        rms_error,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};
    use surface_types::uv_sphere;

    #[test]
    fn add_and_lookup() {
        let mut set = LandmarkSet::new();
        let a = set.add("a", Point3::new(1.0, 0.0, 0.0));
        let b = set.add("b", Point3::new(0.0, 1.0, 0.0));

        assert_eq!(set.len(), 2);
        assert_eq!(set.find_by_label("b"), Some(b));
        assert_eq!(set.find_by_label("z"), None);
        assert_eq!(set.get(a).unwrap().label, "a");
        assert_eq!(a.to_string(), "#0");
    }

    #[test]
    fn nested_midpoints_follow_parents() {
        let mut set = LandmarkSet::new();
        let a = set.add("a", Point3::new(0.0, 0.0, 0.0));
        let b = set.add("b", Point3::new(4.0, 0.0, 0.0));
        let ab = set.add_midpoint("ab", a, b).unwrap();
        let abb = set.add_midpoint("abb", ab, b).unwrap();

        assert_eq!(set.get(abb).unwrap().position, Point3::new(3.0, 0.0, 0.0));

        set.set_position(a, Point3::new(0.0, 8.0, 0.0)).unwrap();
        assert_eq!(set.get(ab).unwrap().position, Point3::new(2.0, 4.0, 0.0));
        assert_eq!(set.get(abb).unwrap().position, Point3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn moving_midpoint_detaches_it() {
        let mut set = LandmarkSet::new();
        let a = set.add("a", Point3::origin());
        let b = set.add("b", Point3::new(2.0, 0.0, 0.0));
        let m = set.add_midpoint("m", a, b).unwrap();

        set.set_position(m, Point3::new(9.0, 9.0, 9.0)).unwrap();
        set.set_position(b, Point3::new(4.0, 0.0, 0.0)).unwrap();

        let state = set.get(m).unwrap();
        assert!(!state.is_midpoint());
        assert_eq!(state.position, Point3::new(9.0, 9.0, 9.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loaded_set_with_dangling_parent() {
        let mut set = LandmarkSet::new();
        let a = set.add("a", Point3::origin());
        let b = set.add("b", Point3::new(2.0, 0.0, 0.0));
        let m = set.add_midpoint("m", a, b).unwrap();

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"midpoint_of\":[0,1]"));
        let json = json.replace("\"midpoint_of\":[0,1]", "\"midpoint_of\":[0,9]");
        let mut loaded: LandmarkSet = serde_json::from_str(&json).unwrap();

        loaded.set_position(a, Point3::new(0.0, 4.0, 0.0)).unwrap();
        assert_eq!(loaded.get(a).unwrap().position, Point3::new(0.0, 4.0, 0.0));
        assert!(loaded.get(m).is_some());
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut set = LandmarkSet::new();
        let a = set.add("a", Point3::origin());
        let ghost = LandmarkId(7);

        assert_eq!(
            set.add_midpoint("m", a, ghost).unwrap_err(),
            RegistrationError::UnknownLandmark(7)
        );
        assert!(set.set_position(ghost, Point3::origin()).is_err());
        assert!(set.set_roi_radius(ghost, 2).is_err());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn projection_snaps_to_vertices() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let index = ClosestPointIndex::from_mesh(&sphere).unwrap();

        let mut set = LandmarkSet::new();
        let north = set.add("north", Point3::new(1.0, -2.0, 120.0));
        let south = set.add("south", Point3::new(0.0, 3.0, -90.0));
        let mid = set.add_midpoint("mid", north, south).unwrap();

        set.project(&index);

        assert_eq!(set.get(north).unwrap().projected_point, Some(0));
        assert_eq!(set.get(north).unwrap().position, sphere.points[0]);
        assert_eq!(set.get(south).unwrap().projected_point, Some(1));

        // Midpoint of the poles is the centre, which every vertex is
        // (nearly) equidistant from
        let m = set.get(mid).unwrap();
        let snapped = m.projected_point.unwrap() as usize;
        assert_eq!(m.position, sphere.points[snapped]);
        assert_eq!(snapped, index.query(&Point3::origin()));
    }

    #[test]
    fn roi_spec_from_projected_radii() {
        let sphere = uv_sphere(Point3::origin(), 100.0, 8, 8);
        let index = ClosestPointIndex::from_mesh(&sphere).unwrap();

        let mut set = LandmarkSet::new();
        let a = set.add("a", sphere.points[9]);
        let b = set.add("b", sphere.points[35]);
        set.add("c", sphere.points[20]);
        set.set_roi_radius(a, 1).unwrap();
        set.set_roi_radius(b, 2).unwrap();

        assert!(matches!(
            set.roi_spec(),
            Err(RegistrationError::UnprojectedLandmark { .. })
        ));

        set.project(&index);
        let roi = set.roi_spec().unwrap();
        assert_eq!(roi.iter().collect::<Vec<_>>(), vec![(9, 1), (35, 2)]);
    }

    #[test]
    fn pairs_match_by_label() {
        let mut fixed = LandmarkSet::new();
        fixed.add("a", Point3::new(1.0, 0.0, 0.0));
        fixed.add("only-fixed", Point3::new(5.0, 5.0, 5.0));
        fixed.add("b", Point3::new(0.0, 1.0, 0.0));

        let mut moving = LandmarkSet::new();
        moving.add("b", Point3::new(0.0, 2.0, 0.0));
        moving.add("a", Point3::new(2.0, 0.0, 0.0));
        moving.add("only-moving", Point3::origin());

        let pairs = paired_positions(&fixed, &moving);
        assert_eq!(pairs.labels, vec!["a", "b"]);
        assert_eq!(pairs.fixed, vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)]);
        assert_eq!(pairs.moving, vec![Point3::new(2.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0)]);
    }

    #[test]
    fn register_recovers_rotation() {
        let moving = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.7);
        let truth = Transform::from_linear_and_translation(rotation.matrix(), Vector3::new(1.0, 2.0, 3.0));
        let fixed: Vec<_> = moving.iter().map(|p| truth.transform_point(p)).collect();

        let reg = register_landmarks(&fixed, &moving, LandmarkTransformMode::RigidBody).unwrap();
        assert_relative_eq!(*reg.transform.matrix(), *truth.matrix(), epsilon = 1e-9);
        assert!(reg.rms_error < 1e-9);
    }

    #[test]
    fn two_pairs_force_rigid() {
        let moving = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let fixed = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];

        let reg = register_landmarks(&fixed, &moving, LandmarkTransformMode::Similarity).unwrap();
        assert_eq!(reg.mode_used, LandmarkTransformMode::RigidBody);
        assert_relative_eq!(reg.transform.scale_factor(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(reg.rms_error, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn register_rejects_mismatch() {
        let err = register_landmarks(&[Point3::origin()], &[], LandmarkTransformMode::RigidBody)
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::MismatchedCorrespondences {
                source_len: 0,
                target_len: 1
            }
        );
    }
}
