// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-bone pose interpolation over a timeline.

use crate::bone::{Bone, BONE_COUNT};
use crate::error::{AnimationError, Result};
use crate::keyframe::{BoneOrientation, Keyframe};
use crate::timeline::Timeline;

/// Orientation of every bone at one instant; `None` for bones no keyframe
/// defines
pub type Pose = [Option<BoneOrientation>; BONE_COUNT];

/// Ramped-linear easing.
///
/// Velocity rises linearly from zero over the ramp phase, then holds at the
/// peak velocity that makes the curve reach exactly 1 at the end of the
/// segment. A ramp ratio of 0 is plain linear motion.
pub struct RampCurve;

impl RampCurve {
    /// Progress in `0..=1` after `elapsed` of a segment lasting `duration`,
    /// easing in over `ramp_ratio * duration`
    pub fn value(elapsed: f64, duration: f64, ramp_ratio: f64) -> f64 {
        if duration <= 0.0 {
            return 1.0;
        }
        let t = elapsed.clamp(0.0, duration);
        let ramp = ramp_ratio.clamp(0.0, 1.0) * duration;
        // Area under the velocity profile, normalized to 1 over the segment.
        let area = duration - ramp / 2.0;
        if t < ramp {
            t * t / (2.0 * ramp * area)
        } else {
            (t - ramp / 2.0) / area
        }
    }
}

/// Read-only pose queries over a timeline
#[derive(Debug, Clone, Copy)]
pub struct Interpolator<'a> {
    timeline: &'a Timeline,
}

impl<'a> Interpolator<'a> {
    /// Create an interpolator over a timeline
    pub fn new(timeline: &'a Timeline) -> Self {
        Self { timeline }
    }

    /// The timeline being queried
    pub fn timeline(&self) -> &'a Timeline {
        self.timeline
    }

    /// Nearest keyframes at or before and at or after `time` that define
    /// `bone`, skipping keyframes where it is unset
    pub fn bracket(&self, bone: Bone, time: i64) -> (Option<&'a Keyframe>, Option<&'a Keyframe>) {
        let timeline = self.timeline;

        let mut prev = timeline.floor_index(time);
        while let Some(index) = prev {
            if timeline.get(index).is_some_and(|kf| kf.is_set(bone)) {
                break;
            }
            prev = index.checked_sub(1);
        }

        let mut next = timeline.ceiling_index(time);
        while let Some(index) = next {
            if index >= timeline.len() {
                next = None;
                break;
            }
            if timeline.get(index).is_some_and(|kf| kf.is_set(bone)) {
                break;
            }
            next = Some(index + 1);
        }

        (
            prev.and_then(|index| timeline.get(index)),
            next.and_then(|index| timeline.get(index)),
        )
    }

    /// Orientation of `bone` at `time`.
    ///
    /// Before the first keyframe defining the bone its orientation is held,
    /// likewise after the last one. Returns `None` if no keyframe defines
    /// the bone.
    pub fn position(&self, bone: Bone, time: i64) -> Option<BoneOrientation> {
        match self.bracket(bone, time) {
            (None, None) => None,
            (Some(kf), None) | (None, Some(kf)) => kf.get(bone),
            (Some(prev), Some(next)) => {
                let from = prev.get(bone)?;
                let to = next.get(bone)?;
                if prev.time() == next.time() {
                    return Some(to);
                }
                // Spans between arbitrary i64 times can exceed i64::MAX.
                let start = i128::from(prev.time());
                let duration = (i128::from(next.time()) - start) as f64;
                let elapsed = (i128::from(time) - start) as f64;
                let value = RampCurve::value(elapsed, duration, to.ramp);
                Some(from.lerp(&to, value))
            }
        }
    }

    /// Like [`position`](Self::position), failing when no keyframe defines
    /// the bone
    pub fn require_position(&self, bone: Bone, time: i64) -> Result<BoneOrientation> {
        self.position(bone, time)
            .ok_or(AnimationError::NoDefiningKeyframe { bone })
    }

    /// Write the pose at `time` into a reusable buffer. Every slot is
    /// overwritten.
    pub fn fill_pose(&self, time: i64, pose: &mut Pose) {
        for bone in Bone::ALL {
            pose[bone.index()] = self.position(bone, time);
        }
    }

    /// Pose at `time`
    pub fn pose(&self, time: i64) -> Pose {
        let mut pose = [None; BONE_COUNT];
        self.fill_pose(time, &mut pose);
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn two_frame_timeline(ramp: f64) -> Timeline {
        let mut timeline = Timeline::new();
        timeline.add(
            Keyframe::new(1000).with(Bone::LowerRightLeg, BoneOrientation::new(PI, 0.0, 0.0).with_ramp(ramp)),
        );
        timeline
    }

    #[test]
    fn test_curve_boundaries() {
        for ramp in [0.0, 0.1, 0.5, 0.9, 1.0] {
            assert_eq!(RampCurve::value(0.0, 1000.0, ramp), 0.0);
            assert_eq!(RampCurve::value(1000.0, 1000.0, ramp), 1.0);
        }
        assert_eq!(RampCurve::value(5.0, 0.0, 0.5), 1.0);
    }

    #[test]
    fn test_curve_is_monotonic_and_continuous() {
        for ramp in [0.0, 0.25, 0.5, 1.0] {
            let mut last = 0.0;
            for step in 0..=1000 {
                let value = RampCurve::value(f64::from(step), 1000.0, ramp);
                assert!(value >= last, "ramp {ramp} step {step}");
                assert!(value - last < 0.01, "ramp {ramp} jumps at {step}");
                last = value;
            }
        }
    }

    #[test]
    fn test_ramp_starts_slower_than_linear() {
        let linear = RampCurve::value(100.0, 1000.0, 0.0);
        let eased = RampCurve::value(100.0, 1000.0, 0.5);
        assert!(eased < linear);
        assert!((linear - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_endpoints_are_exact() {
        for ramp in [0.0, 0.3, 1.0] {
            let timeline = two_frame_timeline(ramp);
            let interpolator = Interpolator::new(&timeline);
            let start = interpolator.position(Bone::LowerRightLeg, 0).unwrap();
            let end = interpolator.position(Bone::LowerRightLeg, 1000).unwrap();
            assert_eq!(start, BoneOrientation::default());
            assert_eq!(end, BoneOrientation::new(PI, 0.0, 0.0).with_ramp(ramp));
        }
    }

    #[test]
    fn test_midpoint_lies_between() {
        let timeline = two_frame_timeline(0.5);
        let mid = Interpolator::new(&timeline)
            .position(Bone::LowerRightLeg, 500)
            .unwrap();
        assert!(mid.pitch > 0.0 && mid.pitch < PI);
        assert_eq!(mid.yaw, 0.0);
        assert_eq!(mid.roll, 0.0);
    }

    #[test]
    fn test_holds_outside_defined_range() {
        let timeline = two_frame_timeline(0.0);
        let interpolator = Interpolator::new(&timeline);
        assert_eq!(interpolator.position(Bone::LowerRightLeg, 5000).unwrap().pitch, PI);
        assert_eq!(interpolator.position(Bone::LowerRightLeg, -50).unwrap().pitch, 0.0);
    }

    #[test]
    fn test_skips_keyframes_without_the_bone() {
        let mut timeline = two_frame_timeline(0.0);
        timeline.add(Keyframe::new(500).with(Bone::Head, BoneOrientation::new(1.0, 1.0, 1.0)));
        let interpolator = Interpolator::new(&timeline);

        let (prev, next) = interpolator.bracket(Bone::LowerRightLeg, 500);
        assert_eq!(prev.map(Keyframe::time), Some(0));
        assert_eq!(next.map(Keyframe::time), Some(1000));
        let at = interpolator.position(Bone::LowerRightLeg, 500).unwrap();
        assert!((at.pitch - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_definition_holds_everywhere() {
        let mut timeline = Timeline::empty();
        timeline.add(Keyframe::new(0));
        timeline.add(Keyframe::new(300).with(Bone::Head, BoneOrientation::new(0.2, 0.3, 0.4)));
        timeline.add(Keyframe::new(900));
        let interpolator = Interpolator::new(&timeline);
        for time in [-100, 0, 150, 300, 600, 900, 5000] {
            assert_eq!(
                interpolator.position(Bone::Head, time),
                Some(BoneOrientation::new(0.2, 0.3, 0.4))
            );
        }
    }

    #[test]
    fn test_undefined_bone_is_absent() {
        let mut timeline = Timeline::empty();
        timeline.add(Keyframe::new(0).with(Bone::Head, BoneOrientation::default()));
        timeline.add(Keyframe::new(1000));
        let interpolator = Interpolator::new(&timeline);
        for time in [-1, 0, 500, 1000, 2000] {
            assert_eq!(interpolator.position(Bone::Torso, time), None);
        }
        assert!(matches!(
            interpolator.require_position(Bone::Torso, 0),
            Err(AnimationError::NoDefiningKeyframe { bone: Bone::Torso })
        ));
    }

    #[test]
    fn test_fill_pose_overwrites_stale_slots() {
        let mut timeline = Timeline::empty();
        timeline.add(Keyframe::new(0).with(Bone::Head, BoneOrientation::new(0.5, 0.0, 0.0)));
        let mut pose: Pose = [Some(BoneOrientation::new(9.0, 9.0, 9.0)); BONE_COUNT];
        Interpolator::new(&timeline).fill_pose(10, &mut pose);
        for bone in Bone::ALL {
            if bone == Bone::Head {
                assert_eq!(pose[bone.index()].unwrap().pitch, 0.5);
            } else {
                assert_eq!(pose[bone.index()], None);
            }
        }
    }

    #[test]
    fn test_widely_spaced_keyframes() {
        let mut timeline = Timeline::empty();
        timeline.add(Keyframe::new(-5_000_000_000_000_000_000).with(Bone::Head, BoneOrientation::new(0.0, 0.0, 0.0)));
        timeline.add(Keyframe::new(5_000_000_000_000_000_000).with(Bone::Head, BoneOrientation::new(2.0, 0.0, 0.0)));
        let interpolator = Interpolator::new(&timeline);

        let mid = interpolator.position(Bone::Head, 0).unwrap();
        assert!((mid.pitch - 1.0).abs() < 1e-9);
        assert_eq!(interpolator.position(Bone::Head, i64::MAX).unwrap().pitch, 2.0);
        assert_eq!(interpolator.position(Bone::Head, i64::MIN).unwrap().pitch, 0.0);
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = Timeline::empty();
        assert_eq!(Interpolator::new(&timeline).position(Bone::Head, 0), None);
    }
}
