// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Prefs port shared across Stepwise tools (CLI, player frontends).

use crate::config::{ConfigError, ConfigService, ConfigStore};
use crate::prefs::{PlayerPrefs, PLAYER_PREFS_KEY};

/// Loads and saves [`PlayerPrefs`] without exposing the storage backend.
pub trait PrefsPort {
    /// Stored prefs, or defaults when missing or unreadable.
    fn load_prefs(&self) -> PlayerPrefs;

    /// Persist prefs.
    ///
    /// # Errors
    /// Whatever the backing store reports.
    fn save_prefs(&self, prefs: &PlayerPrefs) -> Result<(), ConfigError>;
}

impl<S: ConfigStore> PrefsPort for ConfigService<S> {
    fn load_prefs(&self) -> PlayerPrefs {
        self.load_or_default(PLAYER_PREFS_KEY)
    }

    fn save_prefs(&self, prefs: &PlayerPrefs) -> Result<(), ConfigError> {
        self.save(PLAYER_PREFS_KEY, prefs)
    }
}
