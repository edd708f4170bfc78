// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animator settings.
//!
//! Settings live in `ragdoll_animator.ron` next to the timeline:
//! - Export sampling, addressing, output file and demo header
//! - Playback speed and looping
//!
//! A missing file means defaults.

use anyhow::{bail, Context, Result};
use ragdoll_animator_timeline::ExportOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const CONFIG_FILE_NAME: &str = "ragdoll_animator.ron";

/// Demo lines written before the exported commands. They set up the map and
/// camera and spawn the player entity (ref 1) that the ragdoll commands pose.
pub const DEFAULT_DEMO_HEADER: &str = r#"1   0   Version 2
0   0   Map maps/City_Zones/City_03_01/City_03_01.txt
0   0   Time 12.000000
0   CAM POS -200.0 -100.0 -200
0   CAM PYR -0.0 1.5707963267948966 0
0   1   Player
0   1   NEW "Doctor Leo"
0   1   COSTUME 0 9bd2ff -2.015267 -1.000000 0.000000 -0.527472 -1.000000 -1.000000 -1.000000 0.000000 0.000000 0.710000 0.760000 1.000000 -0.350000 1.000000 -1.000000 -1.000000 -1.000000 -1.000000 -1.000000 -0.800000 -1.000000 1.000000 1.000000 1.000000 -1.000000 -1.000000 -1.000000 -0.410000 -0.510000 -0.860000
0   1   PARTSNAME Tight !Hips_V_Vanguard_01 !Hips_V_Vanguard_01_Mask 660000 ff4d4c
0   1   PARTSNAME Tight !Chest_V_Vanguard_01 !Chest_V_Vanguard_01_Mask 660000 ff4d4c
0   1   PARTSNAME V_MALE_HEAD.GEO/GEO_Head_V_Asym_Standard !v_face_skin_head_11 none 000000 000000
0   1   PARTSNAME Wristband skin_wristband_01a skin_wristband_01b 000000 ff894c
0   1   PARTSNAME V_MALE_BOOT.GEO/GEO_Lleg*_Rocket_01 !X_male_boot_rocket_01 none 000000 ff894c 000000 000000 AnimatedCharacterParts/RocketBoots.fx
0   1   PARTSNAME V_MALE_BELT.GEO/GEO_Belt_Vangaurd_02 !X_Vanguard_Belt none 000000 ff894c
0   1   PARTSNAME Style_03 Style_01a Style_01b 000a1f 000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME Glasses_01 Gradient_01a Gradient_01b 000000 0000ff
0   1   PARTSNAME V_MALE_EMBLEM.GEO/GEO_Emblem_Vangaurd_02 !X_Vanguard_Belt none 000000 ff894c
0   1   PARTSNAME V_MALE_SPADR.GEO/GEO_SpadR_Vangaurd_01 !X_Vanguard_Shoulder none 000000 ff894c
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME Chin_01 Tech_01a Tech_01b 0000ff 000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME none none none 000000 00000000
0   1   PARTSNAME none none none 000000 00000000
0   1   PARTSNAME none none none 000000 00000000
0   1   PARTSNAME none none none 00000000 000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME none none none 000000 00000000
0   1   PARTSNAME none none none 000000 00000000
0   1   PARTSNAME none none none 000000 000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   PARTSNAME none none none 00000000 00000000
0   1   POS -210.0 -100.0 -200.0
0   1   PYR 0.0 1.5707963267948966 0
"#;

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Ticks between samples
    pub step: i64,
    /// Entity reference the commands address
    pub ref_id: u32,
    /// Offset added to the time tokens of every command
    pub base_time_offset: i64,
    /// Output file, relative to the working directory
    pub output_path: PathBuf,
    /// Text written before the commands
    pub header: String,
}

impl ExportSettings {
    /// Sampling options for the exporter
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            step: self.step,
            ref_id: self.ref_id,
            base_time_offset: self.base_time_offset,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        let options = ExportOptions::default();
        Self {
            step: options.step,
            ref_id: options.ref_id,
            base_time_offset: options.base_time_offset,
            output_path: PathBuf::from("export.cohdemo"),
            header: DEFAULT_DEMO_HEADER.to_string(),
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Wrap around at the end of the timeline
    pub looping: bool,
    /// Speed multiplier
    pub speed: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            looping: true,
            speed: 1.0,
        }
    }
}

/// All animator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Settings format version
    pub version: u32,
    /// Export settings
    pub export: ExportSettings,
    /// Playback settings
    pub playback: PlaybackSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            export: ExportSettings::default(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings = ron::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;

        if settings.version > CONFIG_FORMAT_VERSION {
            bail!(
                "Settings version {} is newer than supported version {}",
                settings.version,
                CONFIG_FORMAT_VERSION
            );
        }

        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No settings file; using defaults");
            Ok(Self::default())
        }
    }

    /// Render as pretty-printed RON
    pub fn to_ron_string(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        ron::ser::to_string_pretty(self, config).context("Failed to serialize settings")
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_ron_string()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, CONFIG_FORMAT_VERSION);
        assert_eq!(settings.export.options(), ExportOptions::default());
        assert_eq!(settings.export.output_path, PathBuf::from("export.cohdemo"));
        assert!(settings.export.header.starts_with("1   0   Version 2\n"));
        assert!(settings.export.header.ends_with("PYR 0.0 1.5707963267948966 0\n"));
        assert!(settings.playback.looping);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut settings = Settings::default();
        settings.export.step = 50;
        settings.export.header = String::new();
        settings.playback.speed = 0.5;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "Settings(export: ExportSettings(step: 20))").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.export.step, 20);
        assert_eq!(settings.export.ref_id, 1);
        assert_eq!(settings.playback, PlaybackSettings::default());
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "Settings(version: 99)").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
