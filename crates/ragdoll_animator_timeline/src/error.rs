// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for timeline operations.

use crate::bone::Bone;
use thiserror::Error;

/// Errors raised by the timeline, interpolator, exporter and edit session
#[derive(Debug, Error)]
pub enum AnimationError {
    /// Bone index outside `0..=10`
    #[error("Bone index out of range: {0} (expected 0..=10)")]
    InvalidIndex(usize),

    /// No keyframe in the timeline defines the bone
    #[error("No keyframe defines bone {bone}")]
    NoDefiningKeyframe {
        /// Bone that was queried
        bone: Bone,
    },

    /// The timeline is empty
    #[error("Timeline has no keyframes")]
    NoKeyframes,

    /// Export step of zero
    #[error("Export step must be positive")]
    InvalidStep,

    /// Persisted timeline failed validation
    #[error("Malformed timeline document: {0}")]
    MalformedDocument(String),

    /// Column index past the last keyframe
    #[error("Column out of range: {0}")]
    ColumnOutOfRange(usize),

    /// The time-0 keyframe cannot be changed this way
    #[error("The anchor keyframe at time 0 is locked")]
    AnchorLocked,

    /// Adjacent keyframes leave no free tick
    #[error("No room for a keyframe between times {prev} and {next}")]
    NoRoomBetween {
        /// Earlier keyframe time
        prev: i64,
        /// Later keyframe time
        next: i64,
    },

    /// A retimed keyframe would change order with its neighbors
    #[error("Time {time} must lie after {prev} and before {next:?}")]
    TimeOutOfOrder {
        /// Requested time
        time: i64,
        /// Previous keyframe time
        prev: i64,
        /// Next keyframe time, if any
        next: Option<i64>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, AnimationError>;
