// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Stepwise crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`executors`] - Synthetic executors with predictable traces
//! - [`traces`] - Trace builder for playback tests

pub mod config;
pub mod executors;
pub mod traces;

pub use config::InMemoryConfigStore;
pub use executors::{CounterState, CountingExecutor, DriftingExecutor};
pub use traces::TraceBuilder;
