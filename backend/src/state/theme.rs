// Theme preference
// Light/dark choice remembered between visits

use super::storage::{Storage, StorageError};
use std::sync::Arc;
use tracing::warn;

/// Storage key of the theme preference
pub const THEME_KEY: &str = "theme";

/// Widget colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Default scheme
    #[default]
    Light,
    /// Dark scheme
    Dark,
}

impl Theme {
    /// Stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse a stored value; anything other than "dark" is light
    pub fn from_stored(value: &str) -> Self {
        if value == "dark" {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    /// The other scheme
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Theme backed by a preference store
pub struct ThemePreference {
    storage: Arc<dyn Storage>,
    current: Theme,
}

impl ThemePreference {
    /// Load the stored theme; unreadable storage falls back to light
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let current = match storage.get(THEME_KEY) {
            Ok(Some(value)) => Theme::from_stored(&value),
            Ok(None) => Theme::Light,
            Err(e) => {
                warn!("Failed to read theme preference: {}", e);
                Theme::Light
            }
        };
        Self { storage, current }
    }

    /// Current theme
    pub fn current(&self) -> Theme {
        self.current
    }

    /// Switch theme and persist the choice
    ///
    /// The in-memory theme switches even when persisting fails.
    pub fn toggle(&mut self) -> Result<Theme, StorageError> {
        self.current = self.current.toggled();
        self.storage.set(THEME_KEY, self.current.as_str())?;
        Ok(self.current)
    }
}
