// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Player preferences shared by Stepwise tools.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Config key the preferences are stored under.
pub const PLAYER_PREFS_KEY: &str = "player";

/// Saved preferences for trace playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerPrefs {
    /// Delay between automatic steps, in milliseconds.
    pub speed_ms: u64,
    /// Fastest speed a user may pick, in milliseconds.
    pub min_speed_ms: u64,
    /// Slowest speed a user may pick, in milliseconds.
    pub max_speed_ms: u64,
    /// Append cumulative counters to narration lines.
    pub show_metrics: bool,
    /// Largest list a user may type in before the tool refuses it.
    pub max_input_items: usize,
}

impl Default for PlayerPrefs {
    fn default() -> Self {
        Self {
            speed_ms: 500,
            min_speed_ms: 1,
            max_speed_ms: 10_000,
            show_metrics: true,
            max_input_items: 50,
        }
    }
}

impl PlayerPrefs {
    /// Playback interval, clamped into the configured bounds.
    ///
    /// Inverted bounds are treated as a single point at `min_speed_ms`.
    pub fn speed(&self) -> Duration {
        Duration::from_millis(self.clamp_ms(self.speed_ms))
    }

    /// Returns a copy with `speed_ms` replaced by the clamped `ms`.
    pub fn with_speed_ms(&self, ms: u64) -> Self {
        Self {
            speed_ms: self.clamp_ms(ms),
            ..self.clone()
        }
    }

    fn clamp_ms(&self, ms: u64) -> u64 {
        let hi = self.max_speed_ms.max(self.min_speed_ms);
        ms.clamp(self.min_speed_ms, hi)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn speed_is_clamped_into_bounds() {
        let prefs = PlayerPrefs::default();
        assert_eq!(prefs.speed(), Duration::from_millis(500));
        assert_eq!(prefs.with_speed_ms(0).speed(), Duration::from_millis(1));
        assert_eq!(prefs.with_speed_ms(60_000).speed_ms, 10_000);
    }

    #[test]
    fn inverted_bounds_collapse_to_min() {
        let prefs = PlayerPrefs {
            min_speed_ms: 200,
            max_speed_ms: 100,
            ..PlayerPrefs::default()
        };
        assert_eq!(prefs.speed(), Duration::from_millis(200));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let prefs: PlayerPrefs = serde_json::from_str(r#"{"speed_ms": 50}"#).unwrap();
        assert_eq!(prefs.speed_ms, 50);
        assert!(prefs.show_metrics);
        assert_eq!(prefs.max_input_items, 50);
    }
}
