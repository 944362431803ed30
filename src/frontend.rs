//! Collaborators used by front ends
//!
//! None of this takes part in conversion: remembered directories, the
//! default output directory, and color themes.

pub mod cloud_storage;
pub mod settings;
pub mod theme;

pub use cloud_storage::{candidate_roots, detect_cloud_storage_root, first_existing_dir};
pub use settings::{SettingKey, SettingsStore};
pub use theme::{Palette, Theme, ThemeRegistry};
