// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Playback controller: a synchronous state machine over one trace.
//!
//! The controller owns a [`PlaybackState`] and moves an index through the
//! loaded [`Trace`]. It never sleeps and never spawns timers. Instead,
//! [`play`](PlaybackController::play) and [`tick`](PlaybackController::tick)
//! hand back a [`ScheduledTick`] that the caller arms however it likes (a
//! tokio sleep in `stepwise-player`, a loop in tests) and feeds back later.
//!
//! # Key Concepts
//!
//! - **Generation**: a counter bumped by every operation that invalidates
//!   pending ticks (`load`, `discard`, `pause`, `reset`, and the start of each
//!   new play chain). Ticks carry the generation they were scheduled under;
//!   a tick from an older generation is stale and changes nothing.
//! - **Phase**: the derived view (`Idle`, `Paused`, `Playing`, `Finished`)
//!   of the raw state, see [`PlaybackPhase`].
//!
//! # Invariants
//!
//! - `current_index` is always `None` or `< trace.len()`.
//! - At most one tick chain is live: `play` while playing schedules nothing.
//! - Playback never loops; reaching the last index clears `is_playing`.
//! - Manual stepping and seeking are ignored while playing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;
use crate::trace::Trace;

/// Fastest accepted tick interval.
pub const MIN_SPEED: Duration = Duration::from_millis(1);
/// Slowest accepted tick interval.
pub const MAX_SPEED: Duration = Duration::from_secs(10);
/// Tick interval used when none is configured.
pub const DEFAULT_SPEED: Duration = Duration::from_millis(500);

/// Raw playback state owned by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Shown snapshot; `None` means nothing shown yet (index `-1`).
    pub current_index: Option<usize>,
    /// Whether the tick chain is running.
    pub is_playing: bool,
    /// Interval between ticks.
    pub speed: Duration,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: None,
            is_playing: false,
            speed: DEFAULT_SPEED,
        }
    }
}

/// Phase derived from [`PlaybackState`] and the trace length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackPhase {
    /// No trace is loaded.
    Unloaded,
    /// Trace loaded, nothing shown yet.
    Idle,
    /// Stopped at an index before the last.
    Paused(usize),
    /// Tick chain running from this index.
    Playing(usize),
    /// Stopped at the last index.
    Finished(usize),
}

/// Proof that a tick was scheduled under a particular generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickToken {
    generation: u64,
}

impl TickToken {
    /// Generation this token was issued under.
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// A tick the caller should deliver back after `delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledTick {
    /// Token to pass to [`PlaybackController::tick`].
    pub token: TickToken,
    /// How long to wait before delivering it.
    pub delay: Duration,
}

/// Result of a manual navigation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// Nothing changed (playing, no trace, or already at a bound).
    NoOp,
    /// Moved forward to `index`.
    Advanced {
        /// New position.
        index: usize,
    },
    /// Moved backward; `None` is the "nothing shown" position.
    Retreated {
        /// New position.
        index: Option<usize>,
    },
    /// Jumped directly to `index`.
    Seeked {
        /// New position.
        index: usize,
    },
}

/// Result of delivering a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The token belongs to a cancelled chain; nothing changed.
    Stale,
    /// The controller is not playing; nothing changed.
    NotPlaying,
    /// Advanced to `index`; deliver `next` to keep going.
    Advanced {
        /// New position.
        index: usize,
        /// The following tick in this chain.
        next: ScheduledTick,
    },
    /// Reached the last index; playback stopped.
    Finished {
        /// Final position.
        index: usize,
    },
}

/// Walks an index through one [`Trace`] on demand.
#[derive(Debug, Clone)]
pub struct PlaybackController<S> {
    trace: Option<Trace<S>>,
    state: PlaybackState,
    generation: u64,
}

impl<S> Default for PlaybackController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PlaybackController<S> {
    /// Creates an empty controller at [`DEFAULT_SPEED`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_speed(DEFAULT_SPEED)
    }

    /// Creates an empty controller with the given (clamped) tick interval.
    #[must_use]
    pub fn with_speed(speed: Duration) -> Self {
        Self {
            trace: None,
            state: PlaybackState {
                speed: clamp_speed(speed),
                ..PlaybackState::default()
            },
            generation: 0,
        }
    }

    /// Replaces the trace and resets to idle. Never starts playback.
    pub fn load(&mut self, trace: Trace<S>) {
        self.trace = Some(trace);
        self.rewind();
    }

    /// Drops the trace entirely.
    pub fn discard(&mut self) {
        self.trace = None;
        self.rewind();
    }

    /// Starts a tick chain.
    ///
    /// From idle the position jumps to `0`. If the position is already the
    /// last index there is nothing to animate: `is_playing` stays `false`
    /// and no tick is scheduled. Calling `play` while playing returns `None`
    /// and leaves the running chain alone.
    pub fn play(&mut self) -> Option<ScheduledTick> {
        let last = self.trace.as_ref()?.last_index();
        if self.state.is_playing {
            return None;
        }
        let start = self.state.current_index.unwrap_or(0);
        self.state.current_index = Some(start);
        if start >= last {
            self.state.is_playing = false;
            return None;
        }
        self.state.is_playing = true;
        self.generation += 1;
        Some(self.schedule())
    }

    /// Stops the tick chain, keeping the position. Idempotent.
    pub fn pause(&mut self) {
        self.state.is_playing = false;
        self.generation += 1;
    }

    /// Returns to the "nothing shown" position and stops. Keeps the trace.
    pub fn reset(&mut self) {
        self.rewind();
    }

    /// Moves one snapshot forward while paused.
    pub fn step_forward(&mut self) -> StepResult {
        let Some(last) = self.navigable_last() else {
            return StepResult::NoOp;
        };
        let next = match self.state.current_index {
            None => 0,
            Some(i) if i < last => i + 1,
            Some(_) => return StepResult::NoOp,
        };
        self.state.current_index = Some(next);
        StepResult::Advanced { index: next }
    }

    /// Moves one snapshot backward while paused; index `0` steps back to
    /// the "nothing shown" position.
    pub fn step_backward(&mut self) -> StepResult {
        if self.navigable_last().is_none() {
            return StepResult::NoOp;
        }
        let prev = match self.state.current_index {
            None => return StepResult::NoOp,
            Some(0) => None,
            Some(i) => Some(i - 1),
        };
        self.state.current_index = prev;
        StepResult::Retreated { index: prev }
    }

    /// Jumps to `index` while paused. Out-of-range indices are ignored.
    pub fn seek(&mut self, index: usize) -> StepResult {
        match self.navigable_last() {
            Some(last) if index <= last => {
                self.state.current_index = Some(index);
                StepResult::Seeked { index }
            }
            _ => StepResult::NoOp,
        }
    }

    /// Sets the tick interval, clamped to `[MIN_SPEED, MAX_SPEED]`.
    ///
    /// An already scheduled tick keeps its delay; the new interval applies
    /// from the next one.
    pub fn set_speed(&mut self, speed: Duration) -> Duration {
        self.state.speed = clamp_speed(speed);
        self.state.speed
    }

    /// Delivers a previously scheduled tick.
    pub fn tick(&mut self, token: TickToken) -> TickOutcome {
        if token.generation != self.generation {
            tracing::trace!(
                token = token.generation,
                current = self.generation,
                "stale tick ignored"
            );
            return TickOutcome::Stale;
        }
        if !self.state.is_playing {
            return TickOutcome::NotPlaying;
        }
        let Some(last) = self.trace.as_ref().map(Trace::last_index) else {
            self.state.is_playing = false;
            return TickOutcome::NotPlaying;
        };
        let index = self.state.current_index.map_or(0, |i| i + 1).min(last);
        self.state.current_index = Some(index);
        if index == last {
            self.state.is_playing = false;
            return TickOutcome::Finished { index };
        }
        TickOutcome::Advanced {
            index,
            next: self.schedule(),
        }
    }

    /// Copy of the raw state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Derived phase.
    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        let Some(trace) = &self.trace else {
            return PlaybackPhase::Unloaded;
        };
        match self.state.current_index {
            None => PlaybackPhase::Idle,
            Some(i) if self.state.is_playing => PlaybackPhase::Playing(i),
            Some(i) if i == trace.last_index() => PlaybackPhase::Finished(i),
            Some(i) => PlaybackPhase::Paused(i),
        }
    }

    /// The snapshot at the current index, if any.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<&Snapshot<S>> {
        let index = self.state.current_index?;
        self.trace.as_ref()?.get(index)
    }

    /// The loaded trace, if any.
    #[must_use]
    pub fn trace(&self) -> Option<&Trace<S>> {
        self.trace.as_ref()
    }

    /// Length of the loaded trace, `0` when none is loaded.
    #[must_use]
    pub fn trace_len(&self) -> usize {
        self.trace.as_ref().map_or(0, Trace::len)
    }

    /// Current generation; bumped whenever pending ticks are invalidated.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn rewind(&mut self) {
        self.state.current_index = None;
        self.state.is_playing = false;
        self.generation += 1;
    }

    fn schedule(&self) -> ScheduledTick {
        ScheduledTick {
            token: TickToken {
                generation: self.generation,
            },
            delay: self.state.speed,
        }
    }

    /// Last index if manual navigation is allowed right now.
    fn navigable_last(&self) -> Option<usize> {
        if self.state.is_playing {
            return None;
        }
        self.trace.as_ref().map(Trace::last_index)
    }
}

fn clamp_speed(speed: Duration) -> Duration {
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::trace::TraceRecorder;

    fn trace_of(len: usize) -> Trace<usize> {
        let mut rec = TraceRecorder::new("step 0", 0);
        for i in 1..len {
            rec.record(format!("step {i}"), i);
        }
        rec.finish()
    }

    fn loaded(len: usize) -> PlaybackController<usize> {
        let mut c = PlaybackController::new();
        c.load(trace_of(len));
        c
    }

    #[test]
    fn load_never_autostarts() {
        let c = loaded(4);
        assert_eq!(c.state().current_index, None);
        assert!(!c.state().is_playing);
        assert_eq!(c.phase(), PlaybackPhase::Idle);
        assert_eq!(c.trace_len(), 4);
    }

    #[test]
    fn play_from_idle_shows_first_snapshot() {
        let mut c = loaded(4);
        let tick = c.play().unwrap();
        assert_eq!(c.phase(), PlaybackPhase::Playing(0));
        assert_eq!(tick.delay, DEFAULT_SPEED);
        assert_eq!(c.current_snapshot().unwrap().description, "step 0");
    }

    #[test]
    fn play_while_playing_does_not_start_second_chain() {
        let mut c = loaded(4);
        let first = c.play().unwrap();
        assert!(c.play().is_none());
        assert!(matches!(c.tick(first.token), TickOutcome::Advanced { index: 1, .. }));
    }

    #[test]
    fn play_at_last_index_is_immediately_stopped() {
        let mut c = loaded(3);
        assert_eq!(c.seek(2), StepResult::Seeked { index: 2 });
        assert!(c.play().is_none());
        assert!(!c.state().is_playing);
        assert_eq!(c.phase(), PlaybackPhase::Finished(2));
    }

    #[test]
    fn single_snapshot_trace_finishes_on_play() {
        let mut c = loaded(1);
        assert!(c.play().is_none());
        assert_eq!(c.phase(), PlaybackPhase::Finished(0));
    }

    #[test]
    fn ticks_auto_stop_at_last_index() {
        let mut c = loaded(3);
        let t0 = c.play().unwrap();
        let TickOutcome::Advanced { index: 1, next } = c.tick(t0.token) else {
            panic!("expected advance");
        };
        assert_eq!(c.tick(next.token), TickOutcome::Finished { index: 2 });
        assert!(!c.state().is_playing);
        assert_eq!(c.tick(next.token), TickOutcome::NotPlaying);
        assert_eq!(c.state().current_index, Some(2));
    }

    #[test]
    fn stale_tick_after_pause_is_ignored() {
        let mut c = loaded(5);
        let t = c.play().unwrap();
        c.pause();
        assert_eq!(c.tick(t.token), TickOutcome::Stale);
        assert_eq!(c.state().current_index, Some(0));

        let resumed = c.play().unwrap();
        assert_ne!(resumed.token, t.token);
        assert_eq!(c.tick(t.token), TickOutcome::Stale);
        assert!(matches!(c.tick(resumed.token), TickOutcome::Advanced { index: 1, .. }));
    }

    #[test]
    fn load_and_reset_cancel_pending_ticks() {
        let mut c = loaded(5);
        let t = c.play().unwrap();
        c.reset();
        assert_eq!(c.tick(t.token), TickOutcome::Stale);

        let t = c.play().unwrap();
        c.load(trace_of(2));
        assert_eq!(c.tick(t.token), TickOutcome::Stale);
        assert_eq!(c.state().current_index, None);
    }

    #[test]
    fn stepping_is_ignored_while_playing() {
        let mut c = loaded(5);
        let _ = c.play();
        assert_eq!(c.step_forward(), StepResult::NoOp);
        assert_eq!(c.step_backward(), StepResult::NoOp);
        assert_eq!(c.seek(3), StepResult::NoOp);
        assert_eq!(c.state().current_index, Some(0));
    }

    #[test]
    fn steps_clamp_at_both_ends() {
        let mut c = loaded(2);
        assert_eq!(c.step_backward(), StepResult::NoOp);
        assert_eq!(c.step_forward(), StepResult::Advanced { index: 0 });
        assert_eq!(c.step_forward(), StepResult::Advanced { index: 1 });
        assert_eq!(c.step_forward(), StepResult::NoOp);
        assert_eq!(c.step_backward(), StepResult::Retreated { index: Some(0) });
        assert_eq!(c.step_backward(), StepResult::Retreated { index: None });
        assert_eq!(c.step_backward(), StepResult::NoOp);
    }

    #[test]
    fn seek_out_of_range_is_noop() {
        let mut c = loaded(3);
        assert_eq!(c.seek(3), StepResult::NoOp);
        assert_eq!(c.state().current_index, None);
    }

    #[test]
    fn speed_is_clamped_and_applies_to_next_tick() {
        let mut c = loaded(4);
        assert_eq!(c.set_speed(Duration::ZERO), MIN_SPEED);
        assert_eq!(c.set_speed(Duration::from_secs(60)), MAX_SPEED);
        c.set_speed(Duration::from_millis(100));
        let t = c.play().unwrap();
        assert_eq!(t.delay, Duration::from_millis(100));
        c.set_speed(Duration::from_millis(40));
        let TickOutcome::Advanced { next, .. } = c.tick(t.token) else {
            panic!("expected advance");
        };
        assert_eq!(next.delay, Duration::from_millis(40));
    }

    #[test]
    fn empty_controller_ignores_everything() {
        let mut c: PlaybackController<usize> = PlaybackController::new();
        assert!(c.play().is_none());
        assert_eq!(c.step_forward(), StepResult::NoOp);
        assert_eq!(c.phase(), PlaybackPhase::Unloaded);
        assert!(c.current_snapshot().is_none());
        assert_eq!(c.trace_len(), 0);
    }

    #[test]
    fn discard_drops_trace_but_reset_keeps_it() {
        let mut c = loaded(3);
        let _ = c.step_forward();
        c.reset();
        assert_eq!(c.trace_len(), 3);
        c.discard();
        assert_eq!(c.trace_len(), 0);
        assert!(c.trace().is_none());
    }
}
