//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding per-item progress counter files
    pub state_dir: PathBuf,

    /// Subfolder name used for the external-storage fallback locations
    pub download_subfolder: String,

    /// Buffer size for streaming reads (bytes)
    pub chunk_buffer_size: usize,

    /// Interval between progress notifications (milliseconds)
    pub notify_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: dirs::cache_dir()
                .map(|d| d.join("vidfetch"))
                .unwrap_or_else(|| PathBuf::from("./.vidfetch")),
            download_subfolder: "Download".to_string(),
            chunk_buffer_size: 8192, // 8KB
            notify_interval_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults if absent
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save settings as JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    pub fn notify_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notify_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let settings = Settings::default();
        assert!(settings.chunk_buffer_size > 0);
        assert!(settings.notify_interval_ms > 0);
        assert_eq!(settings.download_subfolder, "Download");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        let mut settings = Settings::default();
        settings.chunk_buffer_size = 4096;
        settings.notify_interval_ms = 250;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.chunk_buffer_size, 4096);
        assert_eq!(loaded.notify_interval_ms, 250);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = Settings::load(&temp.path().join("nope.json"));
        assert_eq!(loaded.chunk_buffer_size, Settings::default().chunk_buffer_size);
    }
}
