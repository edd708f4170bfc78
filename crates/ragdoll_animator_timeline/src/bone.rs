// SPDX-License-Identifier: MIT OR Apache-2.0
//! The eleven bones of the ragdoll figure.

use crate::error::AnimationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bones in every keyframe
pub const BONE_COUNT: usize = 11;

/// A bone of the figure, in export order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bone {
    /// Lower right leg
    LowerRightLeg,
    /// Upper right leg
    UpperRightLeg,
    /// Lower left leg
    LowerLeftLeg,
    /// Upper left leg
    UpperLeftLeg,
    /// Lower left arm
    LowerLeftArm,
    /// Upper left arm
    UpperLeftArm,
    /// Lower right arm
    LowerRightArm,
    /// Upper right arm
    UpperRightArm,
    /// Head
    Head,
    /// Torso
    Torso,
    /// Waist
    Waist,
}

impl Bone {
    /// All bones, indexed by their slot number
    pub const ALL: [Bone; BONE_COUNT] = [
        Bone::LowerRightLeg,
        Bone::UpperRightLeg,
        Bone::LowerLeftLeg,
        Bone::UpperLeftLeg,
        Bone::LowerLeftArm,
        Bone::UpperLeftArm,
        Bone::LowerRightArm,
        Bone::UpperRightArm,
        Bone::Head,
        Bone::Torso,
        Bone::Waist,
    ];

    /// Slot number of this bone (`0..=10`)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a bone by slot number
    pub fn from_index(index: usize) -> Result<Self, AnimationError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(AnimationError::InvalidIndex(index))
    }

    /// Get the display name
    pub fn name(self) -> &'static str {
        match self {
            Self::LowerRightLeg => "Lower Right Leg",
            Self::UpperRightLeg => "Upper Right Leg",
            Self::LowerLeftLeg => "Lower Left Leg",
            Self::UpperLeftLeg => "Upper Left Leg",
            Self::LowerLeftArm => "Lower Left Arm",
            Self::UpperLeftArm => "Upper Left Arm",
            Self::LowerRightArm => "Lower Right Arm",
            Self::UpperRightArm => "Upper Right Arm",
            Self::Head => "Head",
            Self::Torso => "Torso",
            Self::Waist => "Waist",
        }
    }

    /// Get the abbreviation used in compact tables
    pub fn short_name(self) -> &'static str {
        match self {
            Self::LowerRightLeg => "LRL",
            Self::UpperRightLeg => "URL",
            Self::LowerLeftLeg => "LLL",
            Self::UpperLeftLeg => "ULL",
            Self::LowerLeftArm => "LLA",
            Self::UpperLeftArm => "ULA",
            Self::LowerRightArm => "LRA",
            Self::UpperRightArm => "URA",
            Self::Head => "H",
            Self::Torso => "T",
            Self::Waist => "W",
        }
    }

    /// Parse a bone from its slot number, short name or display name
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(index) = input.parse::<usize>() {
            return Self::from_index(index).ok();
        }
        Self::ALL.iter().copied().find(|bone| {
            bone.short_name().eq_ignore_ascii_case(input) || bone.name().eq_ignore_ascii_case(input)
        })
    }
}

impl TryFrom<usize> for Bone {
    type Error = AnimationError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index)
    }
}

impl fmt::Display for Bone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
