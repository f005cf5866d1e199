//! Error types for surface registration operations.

use surface_topology::TopologyError;
use thiserror::Error;

/// Broad classification of a [`RegistrationError`].
///
/// Callers that only need to know whether to fix their input or their data
/// can match on this instead of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad arguments: empty inputs, mismatched lengths, invalid parameters.
    InvalidInput,
    /// Arguments are well-formed but geometrically unusable.
    DegenerateInput,
}

/// Errors that can occur during surface registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// The fixed (target) surface has no points.
    #[error("fixed surface has no points")]
    EmptyFixed,

    /// The moving (source) surface has no points.
    #[error("moving surface has no points")]
    EmptyMoving,

    /// A point set used to build a closest-point index is empty.
    #[error("point set is empty")]
    EmptyPointSet,

    /// A point has a NaN or infinite coordinate.
    #[error("point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// Index of the offending point.
        index: usize,
    },

    /// Source and target correspondences differ in length.
    #[error("correspondence sets differ in length: {source_len} source vs {target_len} target")]
    MismatchedCorrespondences {
        /// Number of source points.
        source_len: usize,
        /// Number of target points.
        target_len: usize,
    },

    /// No correspondences were supplied.
    #[error("no correspondences to solve from")]
    NoCorrespondences,

    /// Singular value decomposition did not produce its factors.
    #[error("SVD computation failed during transform estimation")]
    SvdFailed,

    /// A registration parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A landmark was referenced that does not exist.
    #[error("unknown landmark {0}")]
    UnknownLandmark(usize),

    /// A landmark needs a surface projection that has not been computed.
    #[error("landmark '{label}' has an ROI radius but is not projected onto the surface")]
    UnprojectedLandmark {
        /// Label of the landmark.
        label: String,
    },

    /// An ROI could not be grown or extracted.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

impl RegistrationError {
    /// Classify this error.
    ///
    /// # Example
    ///
    /// ```
    /// use surface_registration::{ErrorKind, RegistrationError};
    ///
    /// assert_eq!(RegistrationError::EmptyFixed.kind(), ErrorKind::InvalidInput);
    /// assert_eq!(RegistrationError::NoCorrespondences.kind(), ErrorKind::DegenerateInput);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCorrespondences | Self::SvdFailed => ErrorKind::DegenerateInput,
            Self::EmptyFixed
            | Self::EmptyMoving
            | Self::EmptyPointSet
            | Self::NonFinitePoint { .. }
            | Self::MismatchedCorrespondences { .. }
            | Self::InvalidParameter(_)
            | Self::UnknownLandmark(_)
            | Self::UnprojectedLandmark { .. }
            | Self::Topology(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
