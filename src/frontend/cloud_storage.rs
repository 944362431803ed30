//! Default output directory discovery
//!
//! Prefers a synchronized folder (OneDrive, Dropbox, Google Drive, iCloud) so
//! converted files show up on the machine running the slicer.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables set by the OneDrive client, most specific first
pub const ONEDRIVE_ENV_VARS: [&str; 3] = ["OneDriveCommercial", "OneDriveConsumer", "OneDrive"];

/// Folder names below the home directory, in install precedence
pub const HOME_FOLDERS: [&str; 4] = ["Dropbox", "OneDrive", "Google Drive", "iCloud Drive"];

/// Candidate directories in priority order
///
/// `env` looks up an environment variable; empty values are skipped. The
/// home directory is listed for `OneDrive*` folders (business accounts are
/// named `OneDrive - Company`).
pub fn candidate_roots(
    home: Option<&Path>,
    env: impl Fn(&str) -> Option<OsString>,
) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = ONEDRIVE_ENV_VARS
        .iter()
        .filter_map(|var| env(var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .collect();

    let Some(home) = home else {
        return candidates;
    };

    candidates.extend(HOME_FOLDERS.iter().map(|name| home.join(name)));
    candidates.extend(onedrive_folders(home));
    candidates.push(
        home.join("Library")
            .join("Mobile Documents")
            .join("com~apple~CloudDocs"),
    );
    candidates.push(home.join("Library").join("CloudStorage").join("iCloud Drive"));
    candidates.push(home.join("iCloudDrive"));

    candidates
}

fn onedrive_folders(home: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(home) else {
        return Vec::new();
    };
    let mut folders: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("OneDrive"))
        .map(|entry| entry.path())
        .collect();
    folders.sort();
    folders
}

/// First candidate that is an existing directory
pub fn first_existing_dir(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|candidate| candidate.is_dir())
}

/// Detect a cloud storage root for the current user
pub fn detect_cloud_storage_root() -> Option<PathBuf> {
    let home = dirs::home_dir();
    first_existing_dir(candidate_roots(home.as_deref(), |var| std::env::var_os(var)))
}
