//! Periodic progress notification
//!
//! A background task samples [`TransferState`] on a fixed interval and
//! pushes snapshots into an mpsc channel. The engine owns the notifier's
//! lifetime: spawned after setup, stopped on every exit path.

use crate::downloader::progress::{TransferProgress, TransferState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to a running progress notification task
pub struct ProgressNotifier {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ProgressNotifier {
    /// Start a task sending one snapshot per `interval` until stopped
    ///
    /// The task also winds down when `cancelled` flips or when the receiver
    /// side of `tx` is dropped.
    pub fn spawn(
        state: Arc<TransferState>,
        tx: mpsc::Sender<TransferProgress>,
        interval: Duration,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = tokio::spawn(async move {
            loop {
                if stop_flag.load(Ordering::Relaxed) || cancelled.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(state.snapshot()).await.is_err() {
                    warn!("Progress receiver dropped, stopping notifier");
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });

        Self { stop, handle }
    }

    /// Stop the notification task
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notifier_delivers_snapshots() {
        let state = TransferState::new();
        state.set_total_bytes(100);
        state.add_bytes(25);

        let (tx, mut rx) = mpsc::channel(16);
        let cancelled = Arc::new(AtomicBool::new(false));
        let notifier = ProgressNotifier::spawn(
            Arc::clone(&state),
            tx,
            Duration::from_millis(10),
            cancelled,
        );

        let snap = rx.recv().await.unwrap();
        assert_eq!(snap.bytes_downloaded, 25);
        assert_eq!(snap.total_bytes, 100);

        notifier.stop();
    }

    #[tokio::test]
    async fn test_notifier_stops_on_cancellation() {
        let state = TransferState::new();
        let (tx, mut rx) = mpsc::channel(16);
        let cancelled = Arc::new(AtomicBool::new(true));
        let _notifier = ProgressNotifier::spawn(
            state,
            tx,
            Duration::from_millis(5),
            cancelled,
        );

        // The sender is dropped when the task exits, closing the channel.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_notifier_sees_live_updates() {
        let state = TransferState::new();
        let (tx, mut rx) = mpsc::channel(16);
        let cancelled = Arc::new(AtomicBool::new(false));
        let notifier = ProgressNotifier::spawn(
            Arc::clone(&state),
            tx,
            Duration::from_millis(5),
            cancelled,
        );

        let _ = rx.recv().await.unwrap();
        state.add_bytes(512);

        // A later snapshot reflects the updated counters.
        let mut latest = 0;
        for _ in 0..10 {
            if let Some(snap) = rx.recv().await {
                latest = snap.bytes_downloaded;
                if latest == 512 {
                    break;
                }
            }
        }
        assert_eq!(latest, 512);

        notifier.stop();
    }
}
