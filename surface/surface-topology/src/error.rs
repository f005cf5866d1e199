//! Error types for topology queries and ROI operations.

use thiserror::Error;

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while building adjacency or growing regions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The mesh has no points.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A cell references a point that does not exist.
    #[error("cell {cell} references point {point} (mesh has {point_count} points)")]
    InvalidCell {
        /// Index of the offending cell.
        cell: usize,
        /// The out-of-range point index.
        point: u32,
        /// Total number of points in the mesh.
        point_count: usize,
    },

    /// A point merge tolerance is negative or not finite.
    #[error("merge tolerance must be finite and non-negative")]
    InvalidTolerance,

    /// The ROI has no seeds.
    #[error("ROI specification has no seeds")]
    EmptyRoi,

    /// An ROI seed is not a point of the mesh.
    #[error("ROI seed {seed} is out of bounds (mesh has {point_count} points)")]
    SeedOutOfBounds {
        /// The invalid seed index.
        seed: u32,
        /// Total number of points in the mesh.
        point_count: usize,
    },
}
