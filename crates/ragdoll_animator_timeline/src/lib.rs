// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe timeline for the ragdoll animator.
//!
//! This crate provides the pose animation core:
//! - Eleven fixed bones with per-keyframe orientations
//! - A time-ordered timeline with neighbor lookups and change events
//! - Sparse per-bone interpolation with ramped easing
//! - Export to the demo player's fixed-point hex protocol
//! - RON persistence and an edit session tying it together
//!
//! ## Architecture
//!
//! Data flows one way: edits go into the [`Timeline`], the [`Interpolator`]
//! reads it to answer point queries, and the exporter samples the
//! interpolator to render text. Nothing downstream mutates the timeline.

pub mod bone;
pub mod keyframe;
pub mod events;
pub mod timeline;
pub mod interpolator;
pub mod export;
pub mod document;
pub mod playback;
pub mod session;
pub mod error;

pub use bone::{Bone, BONE_COUNT};
pub use keyframe::{Axis, BoneOrientation, Keyframe, ExternalAngle};
pub use events::{EventBus, SubscriptionId};
pub use timeline::{Coverage, Row, Timeline, TimelineEvent};
pub use interpolator::{Interpolator, Pose, RampCurve};
pub use export::{ExportOptions, Exporter};
pub use document::{BoneSlot, KeyframeRecord, TimelineDocument};
pub use playback::{PlaybackController, PlaybackState};
pub use session::EditSession;
pub use error::{AnimationError, Result};
