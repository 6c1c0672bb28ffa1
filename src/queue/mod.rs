//! Interface types shared with the external download queue
//!
//! Queue ordering, persistence and metadata fetching live outside this
//! crate; the engine only consumes one [`DownloadItem`] per run and
//! publishes its phase through [`PhaseSignal`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// One pending download, as handed over by the queue
///
/// Immutable snapshot: one engine run consumes exactly one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Direct URL of the video content, or the manifest/base URL for
    /// chunked sources
    pub video_url: String,

    /// Separate audio stream URL, present only for sources that split
    /// audio and video
    pub audio_url: Option<String>,

    /// Output file name without extension
    pub name: String,

    /// Output file extension (no leading dot)
    pub ext: String,

    /// Hosting site the item was captured from (e.g. "dailymotion.com"),
    /// selects the chunk resolution rule
    pub source_website: String,

    /// Expected total size in bytes; 0 when unknown. Used by the default
    /// strategy only
    pub size: u64,

    /// Whether the content is addressed as a sequence of discrete chunks
    pub is_chunked: bool,
}

impl DownloadItem {
    /// Output file name with extension
    pub fn filename(&self) -> String {
        format!("{}.{}", self.name, self.ext)
    }
}

/// Coarse activity phase published for observers (notification UI etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    Inactive,
    /// The orchestrator is fetching item metadata before the transfer
    FetchingDetails,
    Downloading,
}

/// Broadcast handle for the current download phase
///
/// Replaces a process-wide mutable singleton: the caller constructs one,
/// injects it into the engine, and subscribes wherever the phase is shown.
#[derive(Debug, Clone)]
pub struct PhaseSignal {
    tx: watch::Sender<DownloadPhase>,
}

impl PhaseSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(DownloadPhase::Inactive);
        Self { tx }
    }

    pub fn set(&self, phase: DownloadPhase) {
        // send_replace updates the value even with no receivers around.
        self.tx.send_replace(phase);
    }

    pub fn get(&self) -> DownloadPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadPhase> {
        self.tx.subscribe()
    }
}

impl Default for PhaseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> DownloadItem {
        DownloadItem {
            video_url: "https://example.com/video.mp4".to_string(),
            audio_url: None,
            name: "clip".to_string(),
            ext: "mp4".to_string(),
            source_website: "example.com".to_string(),
            size: 1024,
            is_chunked: false,
        }
    }

    #[test]
    fn test_filename() {
        assert_eq!(sample_item().filename(), "clip.mp4");
    }

    #[test]
    fn test_item_serde_roundtrip() {
        let item = sample_item();
        let json = serde_json::to_string(&item).unwrap();
        let back: DownloadItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.video_url, item.video_url);
        assert_eq!(back.size, item.size);
        assert!(!back.is_chunked);
    }

    #[test]
    fn test_phase_signal_broadcast() {
        let signal = PhaseSignal::new();
        let mut rx = signal.subscribe();
        assert_eq!(*rx.borrow(), DownloadPhase::Inactive);

        signal.set(DownloadPhase::Downloading);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), DownloadPhase::Downloading);
        assert_eq!(signal.get(), DownloadPhase::Downloading);
    }

    #[test]
    fn test_phase_signal_without_subscribers() {
        let signal = PhaseSignal::new();
        signal.set(DownloadPhase::FetchingDetails);
        assert_eq!(signal.get(), DownloadPhase::FetchingDetails);
    }
}
