// State management module
// Handles front-end preferences and their persistence

pub mod storage;
pub mod theme;

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use theme::{Theme, ThemePreference, THEME_KEY};
