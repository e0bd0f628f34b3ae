// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Stepwise tools (config, prefs).
//! Keeps CLI and player adapters thin and storage-agnostic.

pub mod config;
pub mod prefs;
pub mod prefs_port;
