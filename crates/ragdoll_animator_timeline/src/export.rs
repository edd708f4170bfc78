// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export of sampled poses to the demo player's command format.
//!
//! Each sample becomes one ragdoll command carrying every bone's pitch, yaw
//! and roll as 8-digit uppercase hex player angles, followed by a chat
//! marker labelled with the sample time:
//!
//! ```text
//! 1 1 EntRagdoll 11 602 503 000002000000020000000200...
//! 0 1 Chat 10 0 "1"
//! ```

use crate::bone::{Bone, BONE_COUNT};
use crate::document::write_atomic;
use crate::error::{AnimationError, Result};
use crate::interpolator::{Interpolator, Pose};
use crate::keyframe::{BoneOrientation, ExternalAngle};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Player command that poses a ragdoll
pub const RAGDOLL_COMMAND: &str = "EntRagdoll";

/// Player command used for the per-sample marker line
pub const MARKER_COMMAND: &str = "Chat";

/// Chat channel of the marker line
pub const MARKER_CHANNEL: u32 = 10;

/// Hex characters in one sample's bone block
pub const BONE_BLOCK_LEN: usize = BONE_COUNT * 3 * 8;

/// Sampling and addressing parameters for an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Ticks between samples
    pub step: i64,
    /// Entity reference the commands address
    pub ref_id: u32,
    /// Offset added to both time tokens of every command
    pub base_time_offset: i64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            step: 33,
            ref_id: 1,
            base_time_offset: 500,
        }
    }
}

/// Renders a timeline as player commands
#[derive(Debug, Clone, Copy)]
pub struct Exporter<'a> {
    interpolator: Interpolator<'a>,
}

impl<'a> Exporter<'a> {
    /// Create an exporter for a timeline
    pub fn new(timeline: &'a Timeline) -> Self {
        Self {
            interpolator: Interpolator::new(timeline),
        }
    }

    /// Sample times `1, 1 + step, ...` up to one step past `end_time`
    pub fn sample_times(end_time: i64, step: i64) -> impl Iterator<Item = i64> {
        let limit = end_time.saturating_add(step);
        std::iter::successors(Some(1_i64), move |time| time.checked_add(step))
            .take_while(move |time| *time < limit)
    }

    /// Render every sample of the timeline
    pub fn export(&self, options: &ExportOptions) -> Result<String> {
        if options.step <= 0 {
            return Err(AnimationError::InvalidStep);
        }
        let end_time = self
            .interpolator
            .timeline()
            .end_time()
            .ok_or(AnimationError::NoKeyframes)?;

        let mut out = String::new();
        let mut pose: Pose = [None; BONE_COUNT];
        let mut warned = [false; BONE_COUNT];
        let mut samples = 0_usize;

        for time in Self::sample_times(end_time, options.step) {
            self.interpolator.fill_pose(time, &mut pose);
            for bone in Bone::ALL {
                if pose[bone.index()].is_none() && !warned[bone.index()] {
                    warned[bone.index()] = true;
                    tracing::warn!(%bone, "Bone has no keyframes; exporting neutral orientation");
                }
            }

            let duration = if samples == 0 { 1 } else { options.step };
            let _ = write!(
                out,
                "{duration} {ref_id} {RAGDOLL_COMMAND} {BONE_COUNT} {later} {now} ",
                ref_id = options.ref_id,
                later = options.base_time_offset + 3 * (time + options.step),
                now = options.base_time_offset + 3 * time,
            );
            Self::encode_pose(&pose, &mut out);
            out.push('\n');
            let _ = writeln!(
                out,
                "0 {ref_id} {MARKER_COMMAND} {MARKER_CHANNEL} 0 \"{time}\"",
                ref_id = options.ref_id,
            );
            samples += 1;
        }

        tracing::debug!(samples, end_time, step = options.step, "Exported animation");
        Ok(out)
    }

    /// Render a header followed by every sample, and replace `path` with the
    /// result in one step
    pub fn export_to_path(&self, options: &ExportOptions, header: &str, path: &Path) -> Result<()> {
        let body = self.export(options)?;
        let mut contents = String::with_capacity(header.len() + body.len());
        contents.push_str(header);
        contents.push_str(&body);
        write_atomic(path, &contents)?;
        tracing::info!(path = %path.display(), "Wrote demo export");
        Ok(())
    }

    /// Append the hex block for a pose. Undefined bones encode as the zero
    /// orientation.
    pub fn encode_pose(pose: &Pose, out: &mut String) {
        for slot in pose {
            let orientation = slot.unwrap_or_default();
            Self::encode_orientation(&orientation, out);
        }
    }

    /// Append pitch, yaw and roll as wrapped 8-digit hex player angles
    pub fn encode_orientation(orientation: &BoneOrientation, out: &mut String) {
        for angle in orientation.to_external() {
            let _ = write!(out, "{:08X}", ExternalAngle::wrap(angle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Keyframe;
    use std::f64::consts::PI;

    fn scenario_timeline() -> Timeline {
        let mut timeline = Timeline::new();
        timeline.add(
            Keyframe::new(1000)
                .with(Bone::LowerRightLeg, BoneOrientation::new(PI, 0.0, 0.0).with_ramp(0.5)),
        );
        timeline
    }

    #[test]
    fn test_first_line_layout() {
        let timeline = scenario_timeline();
        let text = Exporter::new(&timeline)
            .export(&ExportOptions::default())
            .unwrap();
        let first = text.lines().next().unwrap();
        let tokens: Vec<&str> = first.split_whitespace().collect();
        assert_eq!(tokens[0], "1");
        assert_eq!(tokens[1], "1");
        assert_eq!(tokens[2], RAGDOLL_COMMAND);
        assert_eq!(tokens[3], "11");
        assert_eq!(tokens[4], (500 + 3 * (1 + 33)).to_string());
        assert_eq!(tokens[5], (500 + 3 * 1).to_string());
        assert_eq!(tokens[6].len(), BONE_BLOCK_LEN);
        assert_eq!(tokens[6], "00000200".repeat(BONE_COUNT * 3));
    }

    #[test]
    fn test_marker_and_later_lines() {
        let timeline = scenario_timeline();
        let text = Exporter::new(&timeline)
            .export(&ExportOptions::default())
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "0 1 Chat 10 0 \"1\"");
        assert!(lines[2].starts_with("33 1 EntRagdoll 11 701 602 "));
        assert_eq!(lines[3], "0 1 Chat 10 0 \"34\"");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_sample_count_and_final_pose() {
        let timeline = scenario_timeline();
        let text = Exporter::new(&timeline)
            .export(&ExportOptions::default())
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // t = 1, 34, ..., 1024
        assert_eq!(lines.len(), 64);
        assert_eq!(lines[63], "0 1 Chat 10 0 \"1024\"");
        let block = lines[62].split_whitespace().last().unwrap();
        assert!(block.starts_with("000000000000020000000200"));
    }

    #[test]
    fn test_empty_timeline_fails() {
        let timeline = Timeline::empty();
        assert!(matches!(
            Exporter::new(&timeline).export(&ExportOptions::default()),
            Err(AnimationError::NoKeyframes)
        ));
    }

    #[test]
    fn test_zero_step_fails() {
        let timeline = Timeline::new();
        let options = ExportOptions {
            step: 0,
            ..ExportOptions::default()
        };
        assert!(matches!(
            Exporter::new(&timeline).export(&options),
            Err(AnimationError::InvalidStep)
        ));
    }

    #[test]
    fn test_anchor_only_emits_single_sample() {
        let timeline = Timeline::new();
        let text = Exporter::new(&timeline)
            .export(&ExportOptions::default())
            .unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_angles_wrap_into_range() {
        let mut out = String::new();
        Exporter::encode_orientation(&BoneOrientation::new(-PI * 1.5, PI * 1.5, 0.0), &mut out);
        // pitch: 768 + 512 = 1280 -> 256; yaw: 768 + 512 = 1280 -> 256
        assert_eq!(out, "000001000000010000000200");
    }

    #[test]
    fn test_export_to_path_writes_header_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.cohdemo");
        let timeline = Timeline::new();
        Exporter::new(&timeline)
            .export_to_path(&ExportOptions::default(), "1 0 Version 2\n", &path)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("1 0 Version 2\n1 1 EntRagdoll 11 "));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
