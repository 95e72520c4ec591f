//! Playback synchronizer: a virtual clock mapped onto the current lyric line.
//!
//! The synchronizer owns the playback state exclusively. Time only moves
//! through `tick` (while playing) and `seek`; after every change the active
//! line index is recomputed from the sorted line sequence. Nothing here
//! blocks or allocates per tick, and no input is rejected: out-of-range
//! values are clamped.

use crate::lyrics::LyricLine;
use crate::timer::sanitize_position;
use std::sync::Arc;

/// Accumulated tick deltas drift (fifty 0.1 s ticks sum to just under 5 s);
/// anything this close to the end counts as the end.
const END_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Paused,
    Playing,
}

/// Snapshot of the clock. `current_line_index` is `None` when no line is
/// active yet (or there are no lines at all).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub state: PlayState,
    pub current_line_index: Option<usize>,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Index in the `-1`-sentinel form used by display surfaces.
    pub fn current_line_index_raw(&self) -> isize {
        self.current_line_index.map_or(-1, |i| i as isize)
    }
}

/// What an operation changed, so callers know whether to redraw or notify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncChange {
    pub index_changed: bool,
    pub state_changed: bool,
}

impl SyncChange {
    pub fn any(&self) -> bool {
        self.index_changed || self.state_changed
    }
}

#[derive(Debug, Clone, Default)]
pub struct Synchronizer {
    lines: Arc<Vec<LyricLine>>,
    duration: f64,
    playback: PlaybackState,
}

impl Synchronizer {
    pub fn new(lines: Arc<Vec<LyricLine>>, duration: f64) -> Self {
        let mut sync = Self {
            lines,
            duration: sanitize_position(duration),
            playback: PlaybackState::default(),
        };
        sync.recompute_index();
        sync
    }

    pub fn lines(&self) -> &Arc<Vec<LyricLine>> {
        &self.lines
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn current_time(&self) -> f64 {
        self.playback.current_time
    }

    pub fn current_line_index(&self) -> Option<usize> {
        self.playback.current_line_index
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn current_line(&self) -> Option<&LyricLine> {
        self.playback
            .current_line_index
            .and_then(|i| self.lines.get(i))
    }

    /// Install a new line sequence and duration. Time is clamped into the new
    /// range; play state is kept.
    pub fn set_lines(&mut self, lines: Arc<Vec<LyricLine>>, duration: f64) -> SyncChange {
        self.lines = lines;
        self.duration = sanitize_position(duration);
        self.playback.current_time = self.playback.current_time.min(self.duration);
        SyncChange {
            index_changed: self.recompute_index(),
            state_changed: false,
        }
    }

    pub fn play(&mut self) -> SyncChange {
        self.set_state(PlayState::Playing)
    }

    pub fn pause(&mut self) -> SyncChange {
        self.set_state(PlayState::Paused)
    }

    pub fn toggle(&mut self) -> SyncChange {
        match self.playback.state {
            PlayState::Playing => self.pause(),
            PlayState::Paused => self.play(),
        }
    }

    /// Advance the clock by `delta` seconds. Ignored while paused. Reaching
    /// the end pins time at `duration` and pauses; an unbounded delta (e.g.
    /// after the host slept) lands there too.
    pub fn tick(&mut self, delta: f64) -> SyncChange {
        if !self.is_playing() || delta.is_nan() || delta < 0.0 {
            return SyncChange::default();
        }
        let next = self.playback.current_time + delta;
        let mut change = SyncChange::default();
        if next >= self.duration - END_EPSILON {
            self.playback.current_time = self.duration;
            self.playback.state = PlayState::Paused;
            change.state_changed = true;
        } else {
            self.playback.current_time = next;
        }
        change.index_changed = self.recompute_index();
        change
    }

    /// Jump to `target` seconds, clamped to `[0, duration]`. Play state is kept.
    pub fn seek(&mut self, target: f64) -> SyncChange {
        self.playback.current_time = sanitize_position(target).min(self.duration);
        SyncChange {
            index_changed: self.recompute_index(),
            state_changed: false,
        }
    }

    pub fn seek_by(&mut self, offset: f64) -> SyncChange {
        if !offset.is_finite() {
            return SyncChange::default();
        }
        self.seek(self.playback.current_time + offset)
    }

    /// Back to the start, paused, no active line.
    pub fn reset(&mut self) -> SyncChange {
        let before = self.playback;
        self.playback = PlaybackState::default();
        self.recompute_index();
        SyncChange {
            index_changed: before.current_line_index != self.playback.current_line_index,
            state_changed: before.state != self.playback.state,
        }
    }

    fn set_state(&mut self, state: PlayState) -> SyncChange {
        let changed = self.playback.state != state;
        self.playback.state = state;
        SyncChange {
            index_changed: false,
            state_changed: changed,
        }
    }

    fn recompute_index(&mut self) -> bool {
        let index = line_index_at(&self.lines, self.playback.current_time);
        let changed = index != self.playback.current_line_index;
        self.playback.current_line_index = index;
        changed
    }
}

/// Greatest `i` with `lines[i].time <= time`, or `None`. `lines` must be sorted.
pub fn line_index_at(lines: &[LyricLine], time: f64) -> Option<usize> {
    if time.is_nan() {
        return None;
    }
    lines.partition_point(|l| l.time <= time).checked_sub(1)
}
