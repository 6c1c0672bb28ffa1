//! Progress tracking for downloads

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live transfer counters, written by the engine and sampled by the notifier
///
/// One-way flow: the notifier only ever reads.
#[derive(Debug, Default)]
pub struct TransferState {
    bytes_downloaded: AtomicU64,
    total_bytes: AtomicU64,
    chunks_completed: AtomicU64,
}

impl TransferState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_bytes(&self, n: u64) {
        self.bytes_downloaded.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_bytes(&self, n: u64) {
        self.bytes_downloaded.store(n, Ordering::Relaxed);
    }

    pub fn set_total_bytes(&self, n: u64) {
        self.total_bytes.store(n, Ordering::Relaxed);
    }

    pub fn set_chunks(&self, n: u64) {
        self.chunks_completed.store(n, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot for display purposes
    pub fn snapshot(&self) -> TransferProgress {
        let bytes = self.bytes_downloaded.load(Ordering::Relaxed);
        let total = self.total_bytes.load(Ordering::Relaxed);
        TransferProgress {
            bytes_downloaded: bytes,
            total_bytes: total,
            chunks_completed: self.chunks_completed.load(Ordering::Relaxed),
            downloaded_display: format_bytes(bytes),
        }
    }
}

/// Progress snapshot pushed to the external sink
#[derive(Debug, Clone)]
pub struct TransferProgress {
    pub bytes_downloaded: u64,
    /// 0 when unknown (chunked downloads, unknown-length streams)
    pub total_bytes: u64,
    /// 0 for non-chunked strategies
    pub chunks_completed: u64,
    /// Human-readable downloaded amount, e.g. "12.3 MB"
    pub downloaded_display: String,
}

impl TransferProgress {
    /// Progress fraction (0.0 to 1.0), or `None` when total size is unknown
    pub fn percentage(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some(self.bytes_downloaded as f64 / self.total_bytes as f64)
    }
}

/// Format a byte count for display
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
