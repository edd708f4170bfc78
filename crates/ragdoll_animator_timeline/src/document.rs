// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted timeline documents.
//!
//! A document lists every keyframe with its time and exactly eleven bone
//! slots, each either `Set(...)` with four components or `Unset`. Loading
//! validates the whole document before building a timeline, so a malformed
//! file never produces a partial timeline.

use crate::bone::{Bone, BONE_COUNT};
use crate::error::{AnimationError, Result};
use crate::keyframe::{BoneOrientation, Keyframe};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// Default timeline file name
pub const DEFAULT_FILE_NAME: &str = "animate.ron";

/// One bone slot of a persisted keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoneSlot {
    /// Bone pinned at this keyframe
    Set {
        /// Pitch in radians
        pitch: f64,
        /// Yaw in radians
        yaw: f64,
        /// Roll in radians
        roll: f64,
        /// Ramp ratio
        ramp: f64,
    },
    /// Bone not pinned at this keyframe
    Unset,
}

impl From<Option<BoneOrientation>> for BoneSlot {
    fn from(slot: Option<BoneOrientation>) -> Self {
        match slot {
            Some(o) => BoneSlot::Set {
                pitch: o.pitch,
                yaw: o.yaw,
                roll: o.roll,
                ramp: o.ramp,
            },
            None => BoneSlot::Unset,
        }
    }
}

impl From<BoneSlot> for Option<BoneOrientation> {
    fn from(slot: BoneSlot) -> Self {
        match slot {
            BoneSlot::Set {
                pitch,
                yaw,
                roll,
                ramp,
            } => Some(BoneOrientation {
                pitch,
                yaw,
                roll,
                ramp,
            }),
            BoneSlot::Unset => None,
        }
    }
}

/// A persisted keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRecord {
    /// Keyframe time
    pub time: i64,
    /// Bone slots in bone order
    pub bones: Vec<BoneSlot>,
}

impl KeyframeRecord {
    fn validate(&self) -> Result<()> {
        if self.time < 0 {
            return Err(malformed(format!("keyframe time {} is negative", self.time)));
        }
        if self.bones.len() != BONE_COUNT {
            return Err(malformed(format!(
                "keyframe at time {} has {} bone slots, expected {BONE_COUNT}",
                self.time,
                self.bones.len()
            )));
        }
        for (index, slot) in self.bones.iter().enumerate() {
            let Some(orientation) = Option::<BoneOrientation>::from(*slot) else {
                continue;
            };
            if !orientation.is_finite() {
                return Err(malformed(format!(
                    "keyframe at time {} has a non-finite value for bone {index}",
                    self.time
                )));
            }
            if !(0.0..=1.0).contains(&orientation.ramp) {
                return Err(malformed(format!(
                    "keyframe at time {} has ramp {} for bone {index}, expected 0 to 1",
                    self.time, orientation.ramp
                )));
            }
        }
        Ok(())
    }

    fn to_keyframe(&self) -> Keyframe {
        let mut keyframe = Keyframe::new(self.time);
        for (bone, slot) in Bone::ALL.iter().zip(&self.bones) {
            if let Some(orientation) = Option::<BoneOrientation>::from(*slot) {
                keyframe.set(*bone, orientation);
            }
        }
        keyframe
    }
}

impl From<&Keyframe> for KeyframeRecord {
    fn from(keyframe: &Keyframe) -> Self {
        Self {
            time: keyframe.time(),
            bones: keyframe.bones().map(|(_, slot)| BoneSlot::from(slot)).collect(),
        }
    }
}

/// Serializable form of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Keyframes in time order
    pub keyframes: Vec<KeyframeRecord>,
}

fn default_version() -> u32 {
    DOCUMENT_FORMAT_VERSION
}

fn malformed(message: impl Into<String>) -> AnimationError {
    AnimationError::MalformedDocument(message.into())
}

impl TimelineDocument {
    /// Capture a timeline
    pub fn from_timeline(timeline: &Timeline) -> Self {
        Self {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: timeline.iter().map(KeyframeRecord::from).collect(),
        }
    }

    /// Validate the document and build a timeline from it.
    ///
    /// The timeline starts from the default anchor. A keyframe at time 0 is
    /// merged into the anchor: its set bones overwrite the anchor's, its
    /// unset bones keep the zero orientation.
    pub fn into_timeline(self) -> Result<Timeline> {
        if self.version > DOCUMENT_FORMAT_VERSION {
            return Err(malformed(format!(
                "document version {} is newer than supported version {DOCUMENT_FORMAT_VERSION}",
                self.version
            )));
        }

        let mut seen = HashSet::with_capacity(self.keyframes.len());
        for record in &self.keyframes {
            record.validate()?;
            if !seen.insert(record.time) {
                return Err(malformed(format!("duplicate keyframe time {}", record.time)));
            }
        }

        let mut anchor = Keyframe::filled(0, BoneOrientation::default());
        let mut others = Vec::with_capacity(self.keyframes.len());
        for record in &self.keyframes {
            let keyframe = record.to_keyframe();
            if keyframe.time() == 0 {
                for (bone, slot) in keyframe.bones() {
                    if let Some(orientation) = slot {
                        anchor.set(bone, orientation);
                    }
                }
            } else {
                others.push(keyframe);
            }
        }

        let mut timeline = Timeline::empty();
        timeline.add_all(std::iter::once(anchor).chain(others));
        tracing::debug!(keyframes = timeline.len(), "Built timeline from document");
        Ok(timeline)
    }

    /// Parse a RON document
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| malformed(e.to_string()))
    }

    /// Render as pretty-printed RON
    pub fn to_ron_string(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config).map_err(|e| malformed(e.to_string()))
    }

    /// Load and validate a timeline file
    pub fn load(path: &Path) -> Result<Timeline> {
        let text = std::fs::read_to_string(path)?;
        let timeline = Self::from_ron_str(&text)?.into_timeline()?;
        tracing::info!(path = %path.display(), keyframes = timeline.len(), "Loaded timeline");
        Ok(timeline)
    }

    /// Save a timeline, replacing `path` in one step
    pub fn save(timeline: &Timeline, path: &Path) -> Result<()> {
        let text = Self::from_timeline(timeline).to_ron_string()?;
        write_atomic(path, &text)?;
        tracing::info!(path = %path.display(), keyframes = timeline.len(), "Saved timeline");
        Ok(())
    }
}

/// Write `contents` to a sibling temporary file, then rename it over `path`
pub(crate) fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, contents)?;

    if let Err(e) = replace(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn replace(from: &Path, to: &Path) -> std::io::Result<()> {
    #[cfg(windows)]
    {
        if to.exists() {
            // Windows rename fails if destination exists.
            std::fs::remove_file(to)?;
        }
    }
    std::fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_timeline() -> Timeline {
        let mut timeline = Timeline::new();
        timeline.set_bone(0, Bone::Head, BoneOrientation::new(0.1, 0.2, 0.3));
        timeline.add(
            Keyframe::new(1000).with(Bone::LowerRightLeg, BoneOrientation::new(1.5, -0.5, 0.25).with_ramp(0.5)),
        );
        timeline.add(Keyframe::new(1500));
        timeline
    }

    fn unset_record(time: i64) -> KeyframeRecord {
        KeyframeRecord {
            time,
            bones: vec![BoneSlot::Unset; BONE_COUNT],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);
        let timeline = sample_timeline();
        TimelineDocument::save(&timeline, &path).unwrap();

        let loaded = TimelineDocument::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        for (a, b) in timeline.iter().zip(loaded.iter()) {
            assert_eq!(a.time(), b.time());
            for bone in Bone::ALL {
                assert_eq!(a.get(bone), b.get(bone));
            }
        }
    }

    #[test]
    fn test_unset_slots_are_explicit() {
        let text = TimelineDocument::from_timeline(&sample_timeline())
            .to_ron_string()
            .unwrap();
        assert!(text.contains("Unset"));
        assert!(text.contains("Set("));
    }

    #[test]
    fn test_anchor_is_merged() {
        let mut anchor = unset_record(0);
        anchor.bones[Bone::Head.index()] = BoneSlot::Set {
            pitch: 1.0,
            yaw: 0.0,
            roll: 0.0,
            ramp: 0.0,
        };
        let document = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![anchor, unset_record(200)],
        };
        let timeline = document.into_timeline().unwrap();
        assert_eq!(timeline.len(), 2);
        let anchor = timeline.get(0).unwrap();
        assert_eq!(anchor.get(Bone::Head).unwrap().pitch, 1.0);
        assert_eq!(anchor.get(Bone::Torso), Some(BoneOrientation::default()));
    }

    #[test]
    fn test_missing_anchor_gets_default() {
        let document = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![unset_record(300)],
        };
        let timeline = document.into_timeline().unwrap();
        assert_eq!(timeline.get(0).unwrap().defined_count(), BONE_COUNT);
        assert_eq!(timeline.end_time(), Some(300));
    }

    #[test]
    fn test_wrong_slot_count_is_rejected() {
        let mut record = unset_record(100);
        record.bones.pop();
        let document = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![record],
        };
        let err = document.into_timeline().unwrap_err();
        assert!(matches!(err, AnimationError::MalformedDocument(ref m) if m.contains("10 bone slots")));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let mut record = unset_record(100);
        record.bones[0] = BoneSlot::Set {
            pitch: f64::NAN,
            yaw: 0.0,
            roll: 0.0,
            ramp: 0.0,
        };
        let nan = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![record.clone()],
        };
        assert!(matches!(nan.into_timeline(), Err(AnimationError::MalformedDocument(_))));

        record.bones[0] = BoneSlot::Set {
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            ramp: 2.0,
        };
        let ramp = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![record],
        };
        assert!(matches!(ramp.into_timeline(), Err(AnimationError::MalformedDocument(_))));
    }

    #[test]
    fn test_duplicate_and_negative_times_are_rejected() {
        let duplicate = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![unset_record(100), unset_record(100)],
        };
        assert!(matches!(duplicate.into_timeline(), Err(AnimationError::MalformedDocument(_))));

        let negative = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            keyframes: vec![unset_record(-5)],
        };
        assert!(matches!(negative.into_timeline(), Err(AnimationError::MalformedDocument(_))));
    }

    #[test]
    fn test_unparseable_text_is_rejected() {
        let err = TimelineDocument::from_ron_str("TimelineDocument(keyframes: [KeyframeRecord(time: \"soon\", bones: [])])")
            .unwrap_err();
        assert!(matches!(err, AnimationError::MalformedDocument(_)));
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let document = TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION + 1,
            keyframes: Vec::new(),
        };
        assert!(matches!(document.into_timeline(), Err(AnimationError::MalformedDocument(_))));
    }

    #[test]
    fn test_parses_handwritten_document() {
        let text = r#"
            TimelineDocument(
                keyframes: [
                    KeyframeRecord(
                        time: 250,
                        bones: [Set(pitch: 0.5, yaw: 0.0, roll: 0.0, ramp: 0.25), Unset, Unset, Unset,
                                Unset, Unset, Unset, Unset, Unset, Unset, Unset],
                    ),
                ],
            )
        "#;
        let timeline = TimelineDocument::from_ron_str(text).unwrap().into_timeline().unwrap();
        let keyframe = timeline.at(250).unwrap();
        assert_eq!(keyframe.get(Bone::LowerRightLeg).unwrap().ramp, 0.25);
        assert_eq!(keyframe.defined_count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TimelineDocument::load(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, AnimationError::Io(_)));
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);
        std::fs::write(&path, "stale").unwrap();

        let mut timeline = Timeline::new();
        timeline.add(Keyframe::new(750));
        TimelineDocument::save(&timeline, &path).unwrap();
        TimelineDocument::save(&timeline, &path).unwrap();

        assert_eq!(TimelineDocument::load(&path).unwrap().len(), 2);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(DEFAULT_FILE_NAME)]);
    }
}
