// SPDX-License-Identifier: MIT OR Apache-2.0
//! Column-addressed editing of a timeline.
//!
//! Editors address keyframes by column, the keyframe's position in time
//! order. Column 0 is always the anchor keyframe at time 0, which can be
//! edited but not removed, retimed or cleared.

use crate::bone::Bone;
use crate::document::TimelineDocument;
use crate::error::{AnimationError, Result};
use crate::export::{ExportOptions, Exporter};
use crate::interpolator::Interpolator;
use crate::keyframe::{Axis, BoneOrientation, ExternalAngle, Keyframe};
use crate::timeline::Timeline;
use std::path::Path;

/// Ticks between the last keyframe and one inserted after it
pub const DEFAULT_KEYFRAME_SPACING: i64 = 1000;

/// Owns the timeline being edited
#[derive(Debug, Default)]
pub struct EditSession {
    timeline: Timeline,
}

impl EditSession {
    /// Start a session on a fresh timeline holding only the anchor
    pub fn new() -> Self {
        Self {
            timeline: Timeline::new(),
        }
    }

    /// Start a session on an existing timeline
    pub fn with_timeline(timeline: Timeline) -> Self {
        Self { timeline }
    }

    /// The timeline being edited
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Take the timeline out of the session
    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    /// Pose queries over the current timeline
    pub fn interpolator(&self) -> Interpolator<'_> {
        Interpolator::new(&self.timeline)
    }

    /// Time of the keyframe in `column`
    pub fn time_of(&self, column: usize) -> Result<i64> {
        self.keyframe(column).map(Keyframe::time)
    }

    fn keyframe(&self, column: usize) -> Result<&Keyframe> {
        self.timeline
            .get(column)
            .ok_or(AnimationError::ColumnOutOfRange(column))
    }

    fn editable_time(&self, column: usize) -> Result<i64> {
        let time = self.time_of(column)?;
        if column == 0 {
            return Err(AnimationError::AnchorLocked);
        }
        Ok(time)
    }

    /// Add an empty keyframe after `column`, halfway to the next keyframe or
    /// [`DEFAULT_KEYFRAME_SPACING`] after the last one. Returns its time.
    pub fn insert_after(&mut self, column: usize) -> Result<i64> {
        let time = self.time_of(column)?;
        let new_time = match self.timeline.get(column + 1) {
            Some(next) => {
                let gap = next.time().abs_diff(time);
                if gap < 2 {
                    return Err(AnimationError::NoRoomBetween {
                        prev: time,
                        next: next.time(),
                    });
                }
                time + (gap / 2) as i64
            }
            None => time
                .checked_add(DEFAULT_KEYFRAME_SPACING)
                .ok_or(AnimationError::NoRoomBetween {
                    prev: time,
                    next: i64::MAX,
                })?,
        };
        self.timeline.add(Keyframe::new(new_time));
        tracing::info!(column, time = new_time, "Inserted keyframe");
        Ok(new_time)
    }

    /// Remove the keyframe in `column`
    pub fn remove_column(&mut self, column: usize) -> Result<Keyframe> {
        let time = self.editable_time(column)?;
        let removed = self
            .timeline
            .remove(time)
            .ok_or(AnimationError::ColumnOutOfRange(column))?;
        tracing::info!(column, time, "Removed keyframe");
        Ok(removed)
    }

    /// Move the keyframe in `column` to `time`, which must lie strictly
    /// between its neighbors
    pub fn retime_column(&mut self, column: usize, time: i64) -> Result<()> {
        let current = self.editable_time(column)?;
        let prev = self.time_of(column - 1)?;
        let next = self.timeline.get(column + 1).map(Keyframe::time);
        if time <= prev || next.is_some_and(|next| time >= next) {
            return Err(AnimationError::TimeOutOfOrder { time, prev, next });
        }
        self.timeline.retime(current, time);
        Ok(())
    }

    /// Pin `bone` to `orientation` in `column`
    pub fn set_bone(&mut self, column: usize, bone: Bone, orientation: BoneOrientation) -> Result<()> {
        let time = self.time_of(column)?;
        self.timeline.set_bone(time, bone, orientation);
        Ok(())
    }

    /// Clear `bone` in `column`. The anchor's bones cannot be cleared.
    pub fn unset_bone(&mut self, column: usize, bone: Bone) -> Result<()> {
        let time = self.editable_time(column)?;
        self.timeline.unset_bone(time, bone);
        Ok(())
    }

    /// Set one axis of `bone` in `column` from player angle units, keeping
    /// the other axes and the ramp. An unset bone starts from the zero
    /// orientation.
    pub fn set_external_angle(&mut self, column: usize, bone: Bone, axis: Axis, value: i32) -> Result<()> {
        let mut orientation = self.keyframe(column)?.get(bone).unwrap_or_default();
        orientation.set_angle(axis, ExternalAngle::to_radians(axis, value));
        self.set_bone(column, bone, orientation)
    }

    /// Set the ramp ratio of `bone` in `column`, clamped to `0..=1`
    pub fn set_ramp(&mut self, column: usize, bone: Bone, ramp: f64) -> Result<()> {
        let orientation = self.keyframe(column)?.get(bone).unwrap_or_default();
        self.set_bone(column, bone, orientation.with_ramp(ramp))
    }

    /// Replace the timeline with the one stored at `path`. On failure the
    /// current timeline is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let loaded = TimelineDocument::load(path)?;
        self.timeline.replace_keyframes(loaded);
        Ok(())
    }

    /// Store the timeline at `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        TimelineDocument::save(&self.timeline, path)
    }

    /// Render the timeline as player commands
    pub fn export(&self, options: &ExportOptions) -> Result<String> {
        Exporter::new(&self.timeline).export(options)
    }

    /// Write `header` and the rendered commands to `path`
    pub fn export_to_path(&self, options: &ExportOptions, header: &str, path: &Path) -> Result<()> {
        Exporter::new(&self.timeline).export_to_path(options, header, path)
    }
}
