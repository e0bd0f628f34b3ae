// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! stepwise-core: deterministic trace recording and playback.
//!
//! An [`Executor`] runs an algorithm to completion and returns a [`Trace`]
//! of immutable [`Snapshot`]s. A [`PlaybackController`] walks an index
//! through that trace, and a [`Presenter`] renders whichever snapshot the
//! index points at. The three never share mutable state.
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

mod executor;
mod metrics;
mod playback;
mod present;
mod snapshot;
mod trace;

/// Executor contract, input rejection and determinism checks.
pub use executor::{reject, verify_determinism, DeterminismError, Executor, InputError};
/// Cumulative counters.
pub use metrics::Metrics;
/// Playback state machine.
pub use playback::{
    PlaybackController, PlaybackPhase, PlaybackState, ScheduledTick, StepResult, TickOutcome,
    TickToken, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED,
};
/// Presenter port and the terminal narration presenter.
pub use present::{NarrationPresenter, Presenter};
/// Snapshot record.
pub use snapshot::Snapshot;
/// Trace, recorder and digests.
pub use trace::{Hash, Trace, TraceDigest, TraceError, TraceRecorder};
