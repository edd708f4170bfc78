// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback of a timeline over a time range.

use crate::interpolator::{Interpolator, Pose};
use crate::timeline::Timeline;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
    /// Playing in reverse
    Reverse,
}

/// Drives a playhead across a range of a timeline
#[derive(Debug, Clone)]
pub struct PlaybackController {
    /// Current playhead position in ticks
    pub time: f64,
    /// Playback state
    pub state: PlaybackState,
    /// Playback speed multiplier
    pub speed: f64,
    /// Whether playback wraps at the range ends
    pub looping: bool,
    start: i64,
    end: i64,
}

impl PlaybackController {
    /// Create a stopped controller over an empty range at time 0
    pub fn new() -> Self {
        Self {
            time: 0.0,
            state: PlaybackState::Stopped,
            speed: 1.0,
            looping: true,
            start: 0,
            end: 0,
        }
    }

    /// Play range start
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Play range end
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Set the play range; the bounds may be given in either order
    pub fn set_range(&mut self, start: i64, end: i64) {
        self.start = start.min(end);
        self.end = start.max(end);
        self.time = self.time.clamp(self.start as f64, self.end as f64);
    }

    /// Cover the timeline from its first to its last keyframe
    pub fn fit_to(&mut self, timeline: &Timeline) {
        let start = timeline.first().map_or(0, |kf| kf.time());
        let end = timeline.end_time().unwrap_or(start);
        self.set_range(start, end);
    }

    /// Collapse the range onto a single time, showing a still pose
    pub fn hold_at(&mut self, time: i64) {
        self.start = time;
        self.end = time;
        self.time = time as f64;
    }

    /// Advance playback by `delta` ticks
    pub fn update(&mut self, delta: f64) {
        match self.state {
            PlaybackState::Playing => {
                self.time += delta * self.speed;
                self.check_bounds();
            }
            PlaybackState::Reverse => {
                self.time -= delta * self.speed;
                self.check_bounds_reverse();
            }
            PlaybackState::Paused | PlaybackState::Stopped => {}
        }
    }

    fn span(&self) -> f64 {
        (i128::from(self.end) - i128::from(self.start)) as f64
    }

    fn check_bounds(&mut self) {
        let end = self.end as f64;
        if self.time < end {
            return;
        }
        if self.looping && self.span() > 0.0 {
            self.time = self.start as f64 + (self.time - self.start as f64).rem_euclid(self.span());
        } else if self.looping {
            self.time = self.start as f64;
        } else {
            self.time = end;
            self.state = PlaybackState::Stopped;
        }
    }

    fn check_bounds_reverse(&mut self) {
        let start = self.start as f64;
        if self.time > start {
            return;
        }
        if self.looping && self.span() > 0.0 {
            self.time = self.end as f64 - (start - self.time).rem_euclid(self.span());
        } else if self.looping {
            self.time = start;
        } else {
            self.time = start;
            self.state = PlaybackState::Stopped;
        }
    }

    /// Play from current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Play in reverse
    pub fn play_reverse(&mut self) {
        self.state = PlaybackState::Reverse;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind to the range start
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = self.start as f64;
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Reverse => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Move the playhead, clamped to the range
    pub fn seek(&mut self, time: i64) {
        self.time = (time as f64).clamp(self.start as f64, self.end as f64);
    }

    /// Is currently playing (forward or reverse)
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Reverse)
    }

    /// Playhead rounded down to a whole tick
    pub fn current_tick(&self) -> i64 {
        self.time.floor() as i64
    }

    /// Write the pose at the playhead into `pose`, returning the tick sampled
    pub fn sample(&self, interpolator: &Interpolator<'_>, pose: &mut Pose) -> i64 {
        let tick = self.current_tick();
        interpolator.fill_pose(tick, pose);
        tick
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
