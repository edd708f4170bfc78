// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for the timeline.

use crate::bone::{Bone, BONE_COUNT};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};

/// Rotation axis of a bone orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Rotation about X
    Pitch,
    /// Rotation about Y
    Yaw,
    /// Rotation about Z
    Roll,
}

impl Axis {
    /// Axes in export order
    pub const ALL: [Axis; 3] = [Axis::Pitch, Axis::Yaw, Axis::Roll];

    /// Single-letter column label
    pub fn label(self) -> &'static str {
        match self {
            Self::Pitch => "P",
            Self::Yaw => "Y",
            Self::Roll => "R",
        }
    }
}

/// Orientation of one bone at a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneOrientation {
    /// Pitch in radians
    pub pitch: f64,
    /// Yaw in radians
    pub yaw: f64,
    /// Roll in radians
    pub roll: f64,
    /// Fraction of the transition into this keyframe spent easing in (0 to 1)
    pub ramp: f64,
}

impl BoneOrientation {
    /// Create an orientation with no ramp
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self {
            pitch,
            yaw,
            roll,
            ramp: 0.0,
        }
    }

    /// Set the ramp ratio, clamped to `0..=1`
    pub fn with_ramp(mut self, ramp: f64) -> Self {
        self.ramp = ramp.clamp(0.0, 1.0);
        self
    }

    /// Get one angle in radians
    pub fn angle(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pitch => self.pitch,
            Axis::Yaw => self.yaw,
            Axis::Roll => self.roll,
        }
    }

    /// Set one angle in radians
    pub fn set_angle(&mut self, axis: Axis, radians: f64) {
        match axis {
            Axis::Pitch => self.pitch = radians,
            Axis::Yaw => self.yaw = radians,
            Axis::Roll => self.roll = radians,
        }
    }

    /// Build an orientation from player angle units
    pub fn from_external(angles: [i32; 3], ramp: f64) -> Self {
        Self {
            pitch: ExternalAngle::to_radians(Axis::Pitch, angles[0]),
            yaw: ExternalAngle::to_radians(Axis::Yaw, angles[1]),
            roll: ExternalAngle::to_radians(Axis::Roll, angles[2]),
            ramp,
        }
    }

    /// Convert pitch, yaw and roll to player angle units (unwrapped)
    pub fn to_external(&self) -> [i32; 3] {
        [
            ExternalAngle::from_radians(Axis::Pitch, self.pitch),
            ExternalAngle::from_radians(Axis::Yaw, self.yaw),
            ExternalAngle::from_radians(Axis::Roll, self.roll),
        ]
    }

    /// Move each angle a fraction `t` of the way towards `target`.
    ///
    /// The ramp is taken from `target`; it describes the segment, not the pose.
    pub fn lerp(&self, target: &BoneOrientation, t: f64) -> BoneOrientation {
        BoneOrientation {
            pitch: lerp(self.pitch, target.pitch, t),
            yaw: lerp(self.yaw, target.yaw, t),
            roll: lerp(self.roll, target.roll, t),
            ramp: target.ramp,
        }
    }

    /// Whether every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite() && self.ramp.is_finite()
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Conversions between radians and the player's 1024-step angle units
pub struct ExternalAngle;

impl ExternalAngle {
    /// Number of player units in a full turn
    pub const FULL_TURN: i32 = 1024;

    /// Player units for a zero angle
    pub const ZERO: i32 = 512;

    /// Convert radians to player units. Pitch runs opposite to yaw and roll.
    pub fn from_radians(axis: Axis, radians: f64) -> i32 {
        let half = f64::from(Self::ZERO);
        let scaled = match axis {
            Axis::Pitch => -half * radians / PI,
            Axis::Yaw | Axis::Roll => half * radians / PI,
        };
        scaled.round() as i32 + Self::ZERO
    }

    /// Convert player units to radians
    pub fn to_radians(axis: Axis, external: i32) -> f64 {
        let half = f64::from(Self::ZERO);
        let offset = f64::from(external - Self::ZERO);
        match axis {
            Axis::Pitch => -PI * offset / half,
            Axis::Yaw | Axis::Roll => PI * offset / half,
        }
    }

    /// Bring a player angle into `0..1024`
    pub fn wrap(external: i32) -> u32 {
        external.rem_euclid(Self::FULL_TURN) as u32
    }
}

/// A keyframe pins the orientation of some or all bones at one time.
///
/// Keyframes are identified by their time alone: two keyframes with equal
/// times compare equal whatever their bones hold.
#[derive(Debug, Clone)]
pub struct Keyframe {
    time: i64,
    bones: [Option<BoneOrientation>; BONE_COUNT],
}

impl Keyframe {
    /// Create a keyframe with every bone unset
    pub fn new(time: i64) -> Self {
        Self {
            time,
            bones: [None; BONE_COUNT],
        }
    }

    /// Create a keyframe with every bone set to `orientation`
    pub fn filled(time: i64, orientation: BoneOrientation) -> Self {
        Self {
            time,
            bones: [Some(orientation); BONE_COUNT],
        }
    }

    /// Time of this keyframe
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Change the time. A keyframe owned by a timeline is retimed through
    /// [`Timeline::retime`](crate::Timeline::retime) instead.
    pub fn set_time(&mut self, time: i64) {
        self.time = time;
    }

    /// Set the time, for chaining
    pub fn at(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    /// Pin a bone, returning the orientation it replaced
    pub fn set(&mut self, bone: Bone, orientation: BoneOrientation) -> Option<BoneOrientation> {
        self.bones[bone.index()].replace(orientation)
    }

    /// Pin a bone, for chaining
    pub fn with(mut self, bone: Bone, orientation: BoneOrientation) -> Self {
        self.set(bone, orientation);
        self
    }

    /// Clear a bone, returning the orientation it held
    pub fn unset(&mut self, bone: Bone) -> Option<BoneOrientation> {
        self.bones[bone.index()].take()
    }

    /// Get a copy of a bone's orientation
    pub fn get(&self, bone: Bone) -> Option<BoneOrientation> {
        self.bones[bone.index()]
    }

    /// Whether this keyframe defines the bone
    pub fn is_set(&self, bone: Bone) -> bool {
        self.bones[bone.index()].is_some()
    }

    /// All slots in bone order
    pub fn bones(&self) -> impl Iterator<Item = (Bone, Option<BoneOrientation>)> + '_ {
        Bone::ALL.iter().map(move |&bone| (bone, self.bones[bone.index()]))
    }

    /// Number of bones this keyframe defines
    pub fn defined_count(&self) -> usize {
        self.bones.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether every bone is unset
    pub fn is_empty(&self) -> bool {
        self.defined_count() == 0
    }
}

impl PartialEq for Keyframe {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for Keyframe {}

impl Hash for Keyframe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.time.hash(state);
    }
}

impl PartialOrd for Keyframe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyframe {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time)
    }
}
