// SPDX-License-Identifier: MIT OR Apache-2.0
//! Time-ordered keyframe collection.

use crate::bone::Bone;
use crate::events::{EventBus, SubscriptionId};
use crate::keyframe::{BoneOrientation, Keyframe};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Row of a keyframe column that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Row {
    /// The keyframe's time
    Time,
    /// One bone's orientation
    Bone(Bone),
}

/// Change notification emitted by a [`Timeline`].
///
/// Every mutation emits exactly one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    /// Keyframes were added, removed or reordered
    GridChanged,
    /// One row of a single keyframe changed in place
    RowChanged {
        /// Column (position) of the keyframe
        column: usize,
        /// Time of the keyframe after the change
        time: i64,
        /// Row that changed
        row: Row,
    },
}

/// How a bone is covered at a keyframe column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coverage {
    /// Set on the time-0 keyframe
    Anchor,
    /// Set, with an eased transition into it
    Ramped,
    /// Set, with a linear transition into it
    Linear,
    /// Unset here but defined by a later keyframe
    Tweened,
    /// Unset here and in every later keyframe
    Undefined,
}

impl Coverage {
    /// Compact cell marker for grid displays
    pub fn marker(self) -> &'static str {
        match self {
            Self::Anchor => " X-",
            Self::Ramped => "->X",
            Self::Linear => "--X",
            Self::Tweened => "---",
            Self::Undefined => "",
        }
    }
}

/// Keyframes ordered by time.
///
/// Times are unique. Keyframes are stored in time order, so the position of
/// a keyframe is also its column, and its neighbors are the keyframes one
/// position before and after it.
#[derive(Debug)]
pub struct Timeline {
    keyframes: IndexMap<i64, Keyframe>,
    events: EventBus<TimelineEvent>,
}

impl Timeline {
    /// Create a timeline holding the anchor keyframe at time 0 with every
    /// bone at the zero orientation
    pub fn new() -> Self {
        let mut timeline = Self::empty();
        timeline.insert(Keyframe::filled(0, BoneOrientation::default()));
        timeline
    }

    /// Create a timeline without any keyframes
    pub fn empty() -> Self {
        Self {
            keyframes: IndexMap::new(),
            events: EventBus::new(),
        }
    }

    /// Add a keyframe. Returns false, without changing anything, if a
    /// keyframe already exists at that time.
    pub fn add(&mut self, keyframe: Keyframe) -> bool {
        let changed = self.insert(keyframe);
        if changed {
            self.events.emit(TimelineEvent::GridChanged);
        }
        changed
    }

    /// Add several keyframes with a single notification
    pub fn add_all(&mut self, keyframes: impl IntoIterator<Item = Keyframe>) -> bool {
        let mut changed = false;
        for keyframe in keyframes {
            changed |= self.insert(keyframe);
        }
        if changed {
            self.events.emit(TimelineEvent::GridChanged);
        }
        changed
    }

    fn insert(&mut self, keyframe: Keyframe) -> bool {
        let time = keyframe.time();
        match self.keyframes.binary_search_keys(&time) {
            Ok(_) => {
                tracing::debug!(time, "Keyframe time already taken");
                false
            }
            Err(index) => {
                self.keyframes.shift_insert(index, time, keyframe);
                tracing::debug!(time, column = index, "Added keyframe");
                true
            }
        }
    }

    /// Remove the keyframe at `time`.
    ///
    /// Removing the time-0 keyframe is allowed here; [`EditSession`](crate::EditSession)
    /// refuses it.
    pub fn remove(&mut self, time: i64) -> Option<Keyframe> {
        let removed = self.keyframes.shift_remove(&time)?;
        tracing::debug!(time, "Removed keyframe");
        self.events.emit(TimelineEvent::GridChanged);
        Some(removed)
    }

    /// Move the keyframe at `time` to `new_time`. Returns false if there is
    /// no keyframe at `time` or `new_time` is taken by another keyframe.
    pub fn retime(&mut self, time: i64, new_time: i64) -> bool {
        if time == new_time {
            return self.keyframes.contains_key(&time);
        }
        if self.keyframes.contains_key(&new_time) {
            return false;
        }
        let Some((old_column, _, mut keyframe)) = self.keyframes.shift_remove_full(&time) else {
            return false;
        };
        keyframe.set_time(new_time);
        let column = self
            .keyframes
            .binary_search_keys(&new_time)
            .unwrap_or_else(|index| index);
        self.keyframes.shift_insert(column, new_time, keyframe);
        tracing::debug!(time, new_time, "Retimed keyframe");

        if column == old_column {
            self.events.emit(TimelineEvent::RowChanged {
                column,
                time: new_time,
                row: Row::Time,
            });
        } else {
            self.events.emit(TimelineEvent::GridChanged);
        }
        true
    }

    /// Pin a bone on the keyframe at `time`. Returns false if there is no
    /// keyframe at `time`.
    pub fn set_bone(&mut self, time: i64, bone: Bone, orientation: BoneOrientation) -> bool {
        let Some((column, _, keyframe)) = self.keyframes.get_full_mut(&time) else {
            return false;
        };
        keyframe.set(bone, orientation);
        self.events.emit(TimelineEvent::RowChanged {
            column,
            time,
            row: Row::Bone(bone),
        });
        true
    }

    /// Clear a bone on the keyframe at `time`. Returns false if there is no
    /// keyframe at `time`. Clearing an unset bone changes nothing and emits
    /// nothing.
    pub fn unset_bone(&mut self, time: i64, bone: Bone) -> bool {
        let Some((column, _, keyframe)) = self.keyframes.get_full_mut(&time) else {
            return false;
        };
        if keyframe.unset(bone).is_some() {
            self.events.emit(TimelineEvent::RowChanged {
                column,
                time,
                row: Row::Bone(bone),
            });
        }
        true
    }

    /// Replace every keyframe with those of `other`, keeping this timeline's
    /// subscribers
    pub fn replace_keyframes(&mut self, other: Timeline) {
        self.keyframes = other.keyframes;
        self.events.emit(TimelineEvent::GridChanged);
    }

    /// Get the keyframe at a column
    pub fn get(&self, column: usize) -> Option<&Keyframe> {
        self.keyframes.get_index(column).map(|(_, kf)| kf)
    }

    /// Get the keyframe at an exact time
    pub fn at(&self, time: i64) -> Option<&Keyframe> {
        self.keyframes.get(&time)
    }

    /// Column of the keyframe at an exact time
    pub fn column_of(&self, time: i64) -> Option<usize> {
        self.keyframes.get_index_of(&time)
    }

    /// Number of keyframes
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the timeline has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Keyframes in time order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Keyframe> + ExactSizeIterator {
        self.keyframes.values()
    }

    /// Earliest keyframe
    pub fn first(&self) -> Option<&Keyframe> {
        self.keyframes.first().map(|(_, kf)| kf)
    }

    /// Latest keyframe
    pub fn last(&self) -> Option<&Keyframe> {
        self.keyframes.last().map(|(_, kf)| kf)
    }

    /// Time of the latest keyframe
    pub fn end_time(&self) -> Option<i64> {
        self.keyframes.last().map(|(time, _)| *time)
    }

    /// Column of the latest keyframe at or before `time`
    pub fn floor_index(&self, time: i64) -> Option<usize> {
        match self.keyframes.binary_search_keys(&time) {
            Ok(index) => Some(index),
            Err(index) => index.checked_sub(1),
        }
    }

    /// Column of the earliest keyframe at or after `time`
    pub fn ceiling_index(&self, time: i64) -> Option<usize> {
        let index = self
            .keyframes
            .binary_search_keys(&time)
            .unwrap_or_else(|index| index);
        (index < self.keyframes.len()).then_some(index)
    }

    /// Latest keyframe at or before `time`
    pub fn floor(&self, time: i64) -> Option<&Keyframe> {
        self.floor_index(time).and_then(|index| self.get(index))
    }

    /// Earliest keyframe at or after `time`
    pub fn ceiling(&self, time: i64) -> Option<&Keyframe> {
        self.ceiling_index(time).and_then(|index| self.get(index))
    }

    /// Latest keyframe strictly before `time`
    pub fn prev_of(&self, time: i64) -> Option<&Keyframe> {
        self.floor(time.checked_sub(1)?)
    }

    /// Earliest keyframe strictly after `time`
    pub fn next_of(&self, time: i64) -> Option<&Keyframe> {
        self.ceiling(time.checked_add(1)?)
    }

    /// How `bone` is covered at a column, for grid displays
    pub fn coverage(&self, column: usize, bone: Bone) -> Option<Coverage> {
        let keyframe = self.get(column)?;
        let coverage = match keyframe.get(bone) {
            Some(_) if keyframe.time() == 0 => Coverage::Anchor,
            Some(orientation) if orientation.ramp > 0.0 => Coverage::Ramped,
            Some(_) => Coverage::Linear,
            None if self.iter().skip(column + 1).any(|kf| kf.is_set(bone)) => Coverage::Tweened,
            None => Coverage::Undefined,
        };
        Some(coverage)
    }

    /// Handle to the change notification list
    pub fn events(&self) -> EventBus<TimelineEvent> {
        self.events.clone()
    }

    /// Register a change listener
    pub fn subscribe(&self, listener: impl FnMut(&TimelineEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    /// Remove a change listener
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Keyframe> for Timeline {
    /// Collect keyframes into a timeline without an anchor. Later duplicates
    /// of a time are dropped.
    fn from_iter<I: IntoIterator<Item = Keyframe>>(iter: I) -> Self {
        let mut timeline = Self::empty();
        for keyframe in iter {
            timeline.insert(keyframe);
        }
        timeline
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Keyframe;
    type IntoIter = indexmap::map::Values<'a, i64, Keyframe>;

    fn into_iter(self) -> Self::IntoIter {
        self.keyframes.values()
    }
}
