//! Download target directory resolution
//!
//! Output files go to the first usable location in a fixed preference
//! chain: the public downloads directory, then a mounted external volume,
//! then the app-private data directory. "Usable" means we can create the
//! directory and write into it, probed with a throwaway file.

use crate::utils::DownloadError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mount condition of the external storage volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaState {
    Mounted,
    Unmounted,
    ReadOnly,
    Removed,
    Checking,
    Ejecting,
    Shared,
    Unmountable,
    NoFilesystem,
    #[default]
    Unknown,
}

/// Why the external volume cannot take downloads right now
fn unavailable_message(state: MediaState) -> &'static str {
    match state {
        MediaState::Mounted => "External media is mounted but not writable.",
        MediaState::Unmounted => "External media is not mounted.",
        MediaState::ReadOnly => "External media is mounted read-only.",
        MediaState::Removed => "External media has been removed.",
        MediaState::Checking => "External media is being checked.",
        MediaState::Ejecting => "External media is being ejected.",
        MediaState::Shared => "External media is shared with another host.",
        MediaState::Unmountable => "External media cannot be mounted.",
        MediaState::NoFilesystem => "External media has no usable filesystem.",
        MediaState::Unknown => "No usable download location is available.",
    }
}

/// The candidate locations considered, in preference order
#[derive(Debug, Clone)]
pub struct StorageCandidates {
    /// Public downloads directory, used as-is
    pub downloads: Option<PathBuf>,
    /// Root of an external volume; a subfolder is created inside it
    pub external_root: Option<PathBuf>,
    /// Mount condition of `external_root`
    pub media_state: MediaState,
    /// App-private data directory; a subfolder is created inside it
    pub app_data: Option<PathBuf>,
}

impl Default for StorageCandidates {
    fn default() -> Self {
        Self {
            downloads: dirs::download_dir(),
            external_root: dirs::home_dir(),
            media_state: MediaState::Mounted,
            app_data: dirs::data_local_dir(),
        }
    }
}

/// Resolves the directory download output files are written to
#[derive(Debug, Clone)]
pub struct StorageLocator {
    candidates: StorageCandidates,
    subfolder: String,
}

impl StorageLocator {
    pub fn new(subfolder: impl Into<String>) -> Self {
        Self {
            candidates: StorageCandidates::default(),
            subfolder: subfolder.into(),
        }
    }

    pub fn with_candidates(candidates: StorageCandidates, subfolder: impl Into<String>) -> Self {
        Self {
            candidates,
            subfolder: subfolder.into(),
        }
    }

    /// Pick the first writable location in the preference chain
    ///
    /// The external volume is only considered while it reports `Mounted`.
    /// When every candidate fails, the error message describes the external
    /// media condition since that is the actionable part.
    pub fn resolve(&self) -> Result<PathBuf, DownloadError> {
        if let Some(dir) = &self.candidates.downloads {
            if validate_dir(dir) {
                debug!("Using downloads directory {}", dir.display());
                return Ok(dir.clone());
            }
            warn!("Downloads directory {} is not writable", dir.display());
        }

        if self.candidates.media_state == MediaState::Mounted {
            if let Some(root) = &self.candidates.external_root {
                let dir = root.join(&self.subfolder);
                if validate_dir(&dir) {
                    debug!("Using external directory {}", dir.display());
                    return Ok(dir);
                }
                warn!("External directory {} is not writable", dir.display());
            }
        }

        if let Some(data) = &self.candidates.app_data {
            let dir = data.join(&self.subfolder);
            if validate_dir(&dir) {
                debug!("Using app data directory {}", dir.display());
                return Ok(dir);
            }
            warn!("App data directory {} is not writable", dir.display());
        }

        Err(DownloadError::Configuration(
            unavailable_message(self.candidates.media_state).to_string(),
        ))
    }
}

/// Create the directory if needed and probe it with a throwaway write
fn validate_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".vidfetch-probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_downloads_dir_wins_when_writable() {
        let temp = TempDir::new().unwrap();
        let downloads = temp.path().join("downloads");
        let external = temp.path().join("external");

        let locator = StorageLocator::with_candidates(
            StorageCandidates {
                downloads: Some(downloads.clone()),
                external_root: Some(external),
                media_state: MediaState::Mounted,
                app_data: None,
            },
            "Download",
        );

        assert_eq!(locator.resolve().unwrap(), downloads);
    }

    #[test]
    fn test_external_used_when_downloads_absent() {
        let temp = TempDir::new().unwrap();
        let external = temp.path().join("external");

        let locator = StorageLocator::with_candidates(
            StorageCandidates {
                downloads: None,
                external_root: Some(external.clone()),
                media_state: MediaState::Mounted,
                app_data: None,
            },
            "Download",
        );

        assert_eq!(locator.resolve().unwrap(), external.join("Download"));
    }

    #[test]
    fn test_unmounted_external_is_skipped() {
        let temp = TempDir::new().unwrap();
        let external = temp.path().join("external");
        let app_data = temp.path().join("appdata");

        let locator = StorageLocator::with_candidates(
            StorageCandidates {
                downloads: None,
                external_root: Some(external),
                media_state: MediaState::Unmounted,
                app_data: Some(app_data.clone()),
            },
            "Download",
        );

        assert_eq!(locator.resolve().unwrap(), app_data.join("Download"));
    }

    #[test]
    fn test_no_candidates_reports_media_state() {
        let locator = StorageLocator::with_candidates(
            StorageCandidates {
                downloads: None,
                external_root: None,
                media_state: MediaState::Removed,
                app_data: None,
            },
            "Download",
        );

        let err = locator.resolve().unwrap_err();
        assert!(matches!(err, DownloadError::Configuration(_)));
        assert!(err.to_string().contains("removed"));
    }

    #[test]
    fn test_resolve_creates_subfolder() {
        let temp = TempDir::new().unwrap();
        let app_data = temp.path().join("appdata");

        let locator = StorageLocator::with_candidates(
            StorageCandidates {
                downloads: None,
                external_root: None,
                media_state: MediaState::Unknown,
                app_data: Some(app_data.clone()),
            },
            "Download",
        );

        let resolved = locator.resolve().unwrap();
        assert!(resolved.is_dir());
        assert_eq!(resolved, app_data.join("Download"));
    }
}
