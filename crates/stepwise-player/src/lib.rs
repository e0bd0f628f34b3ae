// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! stepwise-player: the time-driven half of playback.
//!
//! [`spawn`] moves a [`PlaybackController`] into a tokio task. The task owns
//! at most one armed timer; when it fires the controller gets the tick token
//! the timer was armed with. Any command that ends the chain (pause, reset,
//! load, discard) disarms the timer, and a token from a superseded chain is
//! ignored by the controller anyway.
//!
//! Callers talk to the task through a cloneable [`PlayerHandle`]. Every
//! command is answered with the resulting [`PlaybackState`]; every change is
//! also published as a [`PlaybackView`] on a `watch` channel.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

use std::time::Duration;

use stepwise_core::{
    PlaybackController, PlaybackPhase, PlaybackState, ScheduledTick, Snapshot, StepResult,
    TickOutcome, TickToken, Trace,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, trace};

const COMMAND_BUFFER: usize = 32;

/// Errors returned by [`PlayerHandle`] calls.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlayerError {
    /// The player task has exited (shutdown, or every handle was dropped).
    #[error("player task has stopped")]
    Closed,
}

/// What subscribers see after every change.
#[derive(Clone, Debug)]
pub struct PlaybackView<S> {
    /// Raw controller state.
    pub state: PlaybackState,
    /// Derived phase.
    pub phase: PlaybackPhase,
    /// Snapshot at the current index, if any.
    pub snapshot: Option<Snapshot<S>>,
    /// Length of the loaded trace; `0` when none.
    pub trace_len: usize,
}

impl<S: Clone> PlaybackView<S> {
    fn of(controller: &PlaybackController<S>) -> Self {
        Self {
            state: controller.state(),
            phase: controller.phase(),
            snapshot: controller.current_snapshot().cloned(),
            trace_len: controller.trace_len(),
        }
    }
}

enum Command<S> {
    Load(Trace<S>),
    Discard,
    Play,
    Pause,
    Reset,
    StepForward,
    StepBackward,
    Seek(usize),
    SetSpeed(Duration),
    Shutdown,
}

struct Request<S> {
    command: Command<S>,
    reply: oneshot::Sender<PlaybackState>,
}

/// Cloneable handle to a running player task.
pub struct PlayerHandle<S> {
    tx: mpsc::Sender<Request<S>>,
    view: watch::Receiver<PlaybackView<S>>,
}

impl<S> Clone for PlayerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            view: self.view.clone(),
        }
    }
}

/// Starts a player task with the given tick interval.
///
/// Must be called from within a tokio runtime. The task exits on
/// [`PlayerHandle::shutdown`] or when the last handle is dropped.
pub fn spawn<S>(speed: Duration) -> (PlayerHandle<S>, JoinHandle<()>)
where
    S: Clone + Send + Sync + 'static,
{
    let controller = PlaybackController::with_speed(speed);
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (view_tx, view_rx) = watch::channel(PlaybackView::of(&controller));
    let player = Player {
        controller,
        rx,
        view: view_tx,
    };
    let task = tokio::spawn(player.run());
    (PlayerHandle { tx, view: view_rx }, task)
}

impl<S> PlayerHandle<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn send(&self, command: Command<S>) -> Result<PlaybackState, PlayerError> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(Request { command, reply })
            .await
            .map_err(|_| PlayerError::Closed)?;
        answer.await.map_err(|_| PlayerError::Closed)
    }

    /// Replaces the trace; playback is idle afterwards.
    pub async fn load(&self, trace: Trace<S>) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Load(trace)).await
    }

    /// Drops the trace.
    pub async fn discard(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Discard).await
    }

    /// Starts or resumes the tick chain. A no-op while already playing.
    pub async fn play(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Play).await
    }

    /// Stops the tick chain, keeping the position.
    pub async fn pause(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Pause).await
    }

    /// Back to the "nothing shown" position.
    pub async fn reset(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Reset).await
    }

    /// One snapshot forward; ignored while playing.
    pub async fn step_forward(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::StepForward).await
    }

    /// One snapshot back; ignored while playing.
    pub async fn step_backward(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::StepBackward).await
    }

    /// Jumps to `index`; ignored while playing or out of range.
    pub async fn seek(&self, index: usize) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Seek(index)).await
    }

    /// Changes the interval used for the next scheduled tick.
    pub async fn set_speed(&self, speed: Duration) -> Result<PlaybackState, PlayerError> {
        self.send(Command::SetSpeed(speed)).await
    }

    /// Stops the task. Later calls on any handle return [`PlayerError::Closed`].
    pub async fn shutdown(&self) -> Result<PlaybackState, PlayerError> {
        self.send(Command::Shutdown).await
    }

    /// Latest published view.
    pub fn view(&self) -> PlaybackView<S> {
        self.view.borrow().clone()
    }

    /// A receiver that wakes on every published change.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackView<S>> {
        self.view.clone()
    }

    /// Waits until the tick chain is not running and returns that view.
    pub async fn wait_until_stopped(&self) -> PlaybackView<S> {
        let mut rx = self.subscribe();
        loop {
            let view = rx.borrow_and_update().clone();
            if !view.state.is_playing {
                return view;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

struct Player<S> {
    controller: PlaybackController<S>,
    rx: mpsc::Receiver<Request<S>>,
    view: watch::Sender<PlaybackView<S>>,
}

impl<S: Clone> Player<S> {
    #[instrument(name = "player", skip_all)]
    async fn run(mut self) {
        let sleep = time::sleep(Duration::ZERO);
        tokio::pin!(sleep);
        let mut armed: Option<TickToken> = None;
        loop {
            tokio::select! {
                request = self.rx.recv() => {
                    let Some(Request { command, reply }) = request else {
                        debug!("all handles dropped");
                        break;
                    };
                    let shutdown = matches!(command, Command::Shutdown);
                    if let Some(tick) = self.apply(command) {
                        sleep.as_mut().reset(Instant::now() + tick.delay);
                        armed = Some(tick.token);
                    }
                    if !self.controller.state().is_playing {
                        armed = None;
                    }
                    self.publish();
                    let _ = reply.send(self.controller.state());
                    if shutdown {
                        break;
                    }
                }
                () = &mut sleep, if armed.is_some() => {
                    let Some(token) = armed.take() else { continue };
                    match self.controller.tick(token) {
                        TickOutcome::Advanced { index, next } => {
                            trace!(index, "advanced");
                            sleep.as_mut().reset(Instant::now() + next.delay);
                            armed = Some(next.token);
                        }
                        TickOutcome::Finished { index } => info!(index, "playback finished"),
                        outcome @ (TickOutcome::Stale | TickOutcome::NotPlaying) => {
                            debug!(?outcome, "tick dropped");
                        }
                    }
                    self.publish();
                }
            }
        }
        info!("player stopped");
    }

    fn apply(&mut self, command: Command<S>) -> Option<ScheduledTick> {
        let c = &mut self.controller;
        match command {
            Command::Load(trace) => {
                info!(len = trace.len(), "trace loaded");
                c.load(trace);
            }
            Command::Discard => c.discard(),
            Command::Play => {
                let tick = c.play();
                debug!(scheduled = tick.is_some(), index = ?c.state().current_index, "play");
                return tick;
            }
            Command::Pause => {
                c.pause();
                debug!(index = ?c.state().current_index, "paused");
            }
            Command::Reset => c.reset(),
            Command::StepForward => log_step(c.step_forward()),
            Command::StepBackward => log_step(c.step_backward()),
            Command::Seek(index) => log_step(c.seek(index)),
            Command::SetSpeed(speed) => {
                let speed = c.set_speed(speed);
                debug!(?speed, "speed changed");
            }
            Command::Shutdown => info!("shutdown requested"),
        }
        None
    }

    fn publish(&self) {
        self.view.send_replace(PlaybackView::of(&self.controller));
    }
}

fn log_step(result: StepResult) {
    match result {
        StepResult::NoOp => debug!("navigation ignored"),
        moved => trace!(?moved, "navigated"),
    }
}
