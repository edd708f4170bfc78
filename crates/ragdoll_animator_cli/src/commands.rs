// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommands.
//!
//! Every editing command loads the timeline file, applies one change and
//! writes the file back. Output goes to the writer passed in so commands can
//! be driven from tests.

use crate::config::Settings;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use ragdoll_animator_timeline::{
    Axis, Bone, Coverage, EditSession, Exporter, PlaybackController, PlaybackState, Pose, Timeline,
    BONE_COUNT,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on frames printed by one `play` run
pub const MAX_PLAY_FRAMES: f64 = 10_000_000.0;

/// Animator subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Create a timeline holding only the anchor pose
    New(NewArgs),

    /// Print the keyframe grid
    Show,

    /// Insert a keyframe after a column
    Add(AddArgs),

    /// Remove the keyframe in a column
    Remove(ColumnArgs),

    /// Set bone angles (player units) or ramp in a column
    Set(SetArgs),

    /// Clear a bone in a column so it is tweened
    Unset(BoneArgs),

    /// Move the keyframe in a column to a new time
    Retime(RetimeArgs),

    /// Print the pose at a time
    Sample(SampleArgs),

    /// Write the demo export
    Export(ExportArgs),

    /// Print sampled poses at a fixed frame rate
    Play(PlayArgs),

    /// Print the effective settings, or write them to the settings file
    Config(ConfigArgs),
}

/// Arguments for the new command
#[derive(Args)]
pub struct NewArgs {
    /// Overwrite an existing timeline file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the add command
#[derive(Args)]
pub struct AddArgs {
    /// Column to insert after
    #[arg(default_value_t = 0)]
    pub after: usize,
}

/// A keyframe column
#[derive(Args)]
pub struct ColumnArgs {
    /// Keyframe column
    pub column: usize,
}

/// A bone in a keyframe column
#[derive(Args)]
pub struct BoneArgs {
    /// Keyframe column
    pub column: usize,

    /// Bone index (0-10), short code (LRL) or name
    #[arg(value_parser = parse_bone)]
    pub bone: Bone,
}

/// Arguments for the set command
#[derive(Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: BoneArgs,

    /// Pitch in player units (512 is zero)
    #[arg(long, allow_hyphen_values = true)]
    pub pitch: Option<i32>,

    /// Yaw in player units (512 is zero)
    #[arg(long, allow_hyphen_values = true)]
    pub yaw: Option<i32>,

    /// Roll in player units (512 is zero)
    #[arg(long, allow_hyphen_values = true)]
    pub roll: Option<i32>,

    /// Fraction of the transition spent easing in (0 to 1)
    #[arg(long)]
    pub ramp: Option<f64>,
}

/// Arguments for the retime command
#[derive(Args)]
pub struct RetimeArgs {
    /// Keyframe column
    pub column: usize,

    /// New time in ticks
    pub time: i64,
}

/// Arguments for the sample command
#[derive(Args)]
pub struct SampleArgs {
    /// Time in ticks
    #[arg(allow_hyphen_values = true)]
    pub time: i64,
}

/// Arguments for the export command
#[derive(Args)]
pub struct ExportArgs {
    /// Output file (defaults to the configured output path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ticks between samples
    #[arg(long)]
    pub step: Option<i64>,

    /// Omit the demo header
    #[arg(long)]
    pub no_header: bool,
}

/// Arguments for the play command
#[derive(Args)]
pub struct PlayArgs {
    /// Frames per second of sampled time
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Passes through the timeline when looping is enabled
    #[arg(long, default_value_t = 1)]
    pub cycles: u32,

    /// Sleep between frames instead of printing as fast as possible
    #[arg(long)]
    pub realtime: bool,
}

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Write the effective settings to the settings file
    #[arg(long)]
    pub write: bool,
}

fn parse_bone(input: &str) -> std::result::Result<Bone, String> {
    Bone::parse(input).ok_or_else(|| format!("unknown bone '{input}'"))
}

/// Files a command works on
pub struct Workspace {
    /// Timeline file
    pub timeline_path: PathBuf,
    /// Settings file
    pub settings_path: PathBuf,
    /// Loaded settings
    pub settings: Settings,
}

impl Workspace {
    fn open(&self) -> Result<EditSession> {
        let mut session = EditSession::new();
        session
            .load(&self.timeline_path)
            .with_context(|| format!("Failed to load timeline: {}", self.timeline_path.display()))?;
        Ok(session)
    }

    fn store(&self, session: &EditSession) -> Result<()> {
        session
            .save(&self.timeline_path)
            .with_context(|| format!("Failed to save timeline: {}", self.timeline_path.display()))
    }

    fn edit(&self, change: impl FnOnce(&mut EditSession) -> Result<()>) -> Result<EditSession> {
        let mut session = self.open()?;
        change(&mut session)?;
        self.store(&session)?;
        Ok(session)
    }
}

/// Execute a command
pub fn execute(command: Command, workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    match command {
        Command::New(args) => new(&args, workspace, out),
        Command::Show => {
            let session = workspace.open()?;
            show(session.timeline(), out)
        }
        Command::Add(args) => {
            let mut time = 0;
            workspace.edit(|session| {
                time = session.insert_after(args.after)?;
                Ok(())
            })?;
            writeln!(out, "Added keyframe at {time}")?;
            Ok(())
        }
        Command::Remove(args) => {
            workspace.edit(|session| {
                session.remove_column(args.column)?;
                Ok(())
            })?;
            writeln!(out, "Removed column {}", args.column)?;
            Ok(())
        }
        Command::Set(args) => set(&args, workspace, out),
        Command::Unset(args) => {
            workspace.edit(|session| Ok(session.unset_bone(args.column, args.bone)?))?;
            writeln!(out, "Unset {} in column {}", args.bone, args.column)?;
            Ok(())
        }
        Command::Retime(args) => {
            workspace.edit(|session| Ok(session.retime_column(args.column, args.time)?))?;
            writeln!(out, "Column {} now at {}", args.column, args.time)?;
            Ok(())
        }
        Command::Sample(args) => {
            let session = workspace.open()?;
            let pose = session.interpolator().pose(args.time);
            write_pose(&pose, out)
        }
        Command::Export(args) => export(&args, workspace, out),
        Command::Play(args) => play(&args, workspace, out),
        Command::Config(args) => {
            if args.write {
                workspace.settings.save(&workspace.settings_path)?;
                writeln!(out, "Wrote {}", workspace.settings_path.display())?;
            } else {
                out.write_all(workspace.settings.to_ron_string()?.as_bytes())?;
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

fn new(args: &NewArgs, workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    let path = &workspace.timeline_path;
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    workspace.store(&EditSession::new())?;
    writeln!(out, "Created {}", path.display())?;
    Ok(())
}

/// Set the given axes and ramp. With none given, pin the bone to its
/// current tweened orientation.
fn set(args: &SetArgs, workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    let BoneArgs { column, bone } = args.target;
    let axes = [(Axis::Pitch, args.pitch), (Axis::Yaw, args.yaw), (Axis::Roll, args.roll)];

    let session = workspace.edit(|session| {
        if axes.iter().all(|(_, value)| value.is_none()) && args.ramp.is_none() {
            let time = session.time_of(column)?;
            let pinned = session.interpolator().position(bone, time).unwrap_or_default();
            session.set_bone(column, bone, pinned)?;
            return Ok(());
        }
        for (axis, value) in axes {
            if let Some(value) = value {
                session.set_external_angle(column, bone, axis, value)?;
            }
        }
        if let Some(ramp) = args.ramp {
            session.set_ramp(column, bone, ramp)?;
        }
        Ok(())
    })?;

    let orientation = session
        .timeline()
        .get(column)
        .and_then(|keyframe| keyframe.get(bone))
        .unwrap_or_default();
    let [pitch, yaw, roll] = orientation.to_external();
    writeln!(
        out,
        "{bone} in column {column}: pitch {pitch} yaw {yaw} roll {roll} ramp {:.2}",
        orientation.ramp
    )?;
    Ok(())
}

/// Print one row per bone with a coverage marker per column
fn show(timeline: &Timeline, out: &mut impl Write) -> Result<()> {
    write!(out, "{:<6}", "Time")?;
    for keyframe in timeline {
        write!(out, "{:>7}", keyframe.time())?;
    }
    writeln!(out)?;

    for bone in Bone::ALL {
        write!(out, "{:<6}", bone.short_name())?;
        for column in 0..timeline.len() {
            let marker = timeline.coverage(column, bone).map_or("", Coverage::marker);
            write!(out, "{marker:>7}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_pose(pose: &Pose, out: &mut impl Write) -> Result<()> {
    write!(out, "{:<20}", "Bone")?;
    for axis in Axis::ALL {
        write!(out, "{:>6}", axis.label())?;
    }
    writeln!(out)?;
    for bone in Bone::ALL {
        match pose[bone.index()] {
            Some(orientation) => {
                let [pitch, yaw, roll] = orientation.to_external();
                writeln!(
                    out,
                    "{:<4}{:<16}{pitch:>6}{yaw:>6}{roll:>6}",
                    bone.short_name(),
                    bone.name()
                )?;
            }
            None => writeln!(out, "{:<4}{:<16}{:>6}", bone.short_name(), bone.name(), "-")?,
        }
    }
    Ok(())
}

fn export(args: &ExportArgs, workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    let settings = &workspace.settings.export;
    let mut options = settings.options();
    if let Some(step) = args.step {
        options.step = step;
    }
    let output = args.output.as_deref().unwrap_or(&settings.output_path);
    let header = if args.no_header { "" } else { settings.header.as_str() };

    let session = workspace.open()?;
    session
        .export_to_path(&options, header, output)
        .with_context(|| format!("Failed to export to {}", output.display()))?;
    writeln!(out, "Exported to {}", output.display())?;
    Ok(())
}

fn play(args: &PlayArgs, workspace: &Workspace, out: &mut impl Write) -> Result<()> {
    let playback_settings = &workspace.settings.playback;
    if args.fps == 0 {
        bail!("Frame rate must be positive");
    }
    if playback_settings.speed <= 0.0 {
        bail!("Playback speed must be positive, got {}", playback_settings.speed);
    }
    let session = workspace.open()?;
    let interpolator = session.interpolator();

    let mut playback = PlaybackController::new();
    playback.fit_to(session.timeline());
    playback.speed = playback_settings.speed;
    playback.looping = playback_settings.looping;
    let frame_ticks = 1000.0 / f64::from(args.fps);
    let cycles = if playback.looping { args.cycles.max(1) } else { 1 };

    let span = playback.end() as f64 - playback.start() as f64;
    let frames_per_pass = (span / (frame_ticks * playback.speed)).ceil();
    // One extra frame for the range end, one for rounding.
    let max_frames = frames_per_pass * f64::from(cycles) + 2.0;
    if !max_frames.is_finite() || max_frames > MAX_PLAY_FRAMES {
        bail!("Playback would need about {max_frames:e} frames; raise the speed or lower the frame rate");
    }

    tracing::info!(
        start = playback.start(),
        end = playback.end(),
        fps = args.fps,
        cycles,
        "Playing timeline"
    );

    let mut pose: Pose = [None; BONE_COUNT];
    let mut completed = 0;
    let mut last_tick = playback.current_tick();
    playback.play();
    for _ in 0..max_frames as u64 {
        let tick = playback.sample(&interpolator, &mut pose);
        print_frame(tick, &pose, out)?;

        if playback.state == PlaybackState::Stopped || playback.start() == playback.end() {
            break;
        }
        playback.update(frame_ticks);
        if playback.current_tick() < last_tick {
            completed += 1;
            if completed >= cycles {
                break;
            }
        }
        last_tick = playback.current_tick();
        if args.realtime {
            std::thread::sleep(Duration::from_secs_f64(frame_ticks / 1000.0));
        }
    }
    Ok(())
}

fn print_frame(tick: i64, pose: &Pose, out: &mut impl Write) -> Result<()> {
    let mut block = String::new();
    Exporter::encode_pose(pose, &mut block);
    writeln!(out, "{tick:>8} {block}")?;
    Ok(())
}
