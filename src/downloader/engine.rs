//! Transfer engine
//!
//! One engine run moves one [`DownloadItem`] from the network to disk.
//! Strategy selection is fixed: items with a separate audio stream get two
//! sequential plain transfers, chunked items walk their chunk sequence, and
//! everything else is a single streamed copy with byte-range resume.
//!
//! The engine never retries. Every failure leaves on-disk state that
//! reflects only fully completed work, so a later run resumes correctly.

use crate::downloader::counter::ChunkCounter;
use crate::downloader::notifier::ProgressNotifier;
use crate::downloader::progress::{TransferProgress, TransferState};
use crate::downloader::resolver;
use crate::queue::{DownloadItem, DownloadPhase, PhaseSignal};
use crate::storage::StorageLocator;
use crate::transport::{FetchError, HttpTransport};
use crate::utils::{DownloadError, Settings};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How a transfer run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// All content the source had to offer is on disk
    Completed,
    /// Stopped on request; partial state stays on disk for resume
    Cancelled,
}

/// Requests cooperative cancellation of a running transfer
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Drives downloads for one item at a time
pub struct TransferEngine {
    transport: Arc<dyn HttpTransport>,
    locator: StorageLocator,
    settings: Settings,
    cancelled: Arc<AtomicBool>,
    phase: Option<PhaseSignal>,
}

impl TransferEngine {
    pub fn new(transport: Arc<dyn HttpTransport>, locator: StorageLocator, settings: Settings) -> Self {
        Self {
            transport,
            locator,
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
            phase: None,
        }
    }

    /// Publish phase transitions through the given signal
    pub fn with_phase_signal(mut self, phase: PhaseSignal) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Handle for cancelling the current (or next) run
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    fn set_phase(&self, phase: DownloadPhase) {
        if let Some(signal) = &self.phase {
            signal.set(phase);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Transfer one item, streaming progress snapshots into `progress_tx`
    pub async fn run(
        &self,
        item: &DownloadItem,
        progress_tx: mpsc::Sender<TransferProgress>,
    ) -> Result<TransferOutcome, DownloadError> {
        self.cancelled.store(false, Ordering::Relaxed);
        self.set_phase(DownloadPhase::Downloading);

        let result = self.run_inner(item, progress_tx).await;

        self.set_phase(DownloadPhase::Inactive);
        match &result {
            Ok(TransferOutcome::Completed) => info!("Download completed: {}", item.filename()),
            Ok(TransferOutcome::Cancelled) => info!("Download cancelled: {}", item.filename()),
            Err(e) => info!("Download failed: {}: {}", item.filename(), e),
        }
        result
    }

    async fn run_inner(
        &self,
        item: &DownloadItem,
        progress_tx: mpsc::Sender<TransferProgress>,
    ) -> Result<TransferOutcome, DownloadError> {
        let target_dir = self.locator.resolve()?;

        let state = TransferState::new();
        let notifier = ProgressNotifier::spawn(
            Arc::clone(&state),
            progress_tx,
            self.settings.notify_interval(),
            Arc::clone(&self.cancelled),
        );

        let result = if item.audio_url.is_some() {
            self.run_combined(item, &target_dir, &state).await
        } else if item.is_chunked {
            self.run_chunked(item, &target_dir, &state).await
        } else {
            let dest = target_dir.join(item.filename());
            let expected = (item.size > 0).then_some(item.size);
            self.run_default(&item.video_url, &dest, expected, &state).await
        };

        notifier.stop();
        result
    }

    /// Single streamed copy with byte-range resume
    ///
    /// An existing partial file is continued with a `Range` request; a file
    /// already at (or past) the expected size completes without touching
    /// the network.
    async fn run_default(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<u64>,
        state: &TransferState,
    ) -> Result<TransferOutcome, DownloadError> {
        let existing = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        if let Some(size) = expected {
            state.set_total_bytes(size);
            if existing >= size {
                debug!("{} already complete at {} bytes", dest.display(), existing);
                state.set_bytes(existing);
                return Ok(TransferOutcome::Completed);
            }
        }
        state.set_bytes(existing);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dest)
            .await
            .map_err(|e| {
                DownloadError::Configuration(format!(
                    "cannot open output file {}: {}",
                    dest.display(),
                    e
                ))
            })?;

        let headers = if existing > 0 {
            debug!("Resuming {} from byte {}", dest.display(), existing);
            vec![("Range".to_string(), format!("bytes={}-", existing))]
        } else {
            Vec::new()
        };

        let mut stream = match self.transport.open(url, &headers).await {
            Ok(s) => s,
            Err(FetchError::NotFound(url)) => {
                return Err(DownloadError::ResourceUnavailable(url));
            }
            Err(FetchError::Io(msg)) => return Err(DownloadError::TransferIo(msg)),
        };

        let mut written = existing;
        let mut buf = vec![0u8; self.settings.chunk_buffer_size];
        loop {
            if self.is_cancelled() {
                file.flush().await?;
                return Ok(TransferOutcome::Cancelled);
            }

            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            // Never write past the declared size.
            let take = match expected {
                Some(size) => (n as u64).min(size - written) as usize,
                None => n,
            };
            file.write_all(&buf[..take]).await?;
            written += take as u64;
            state.add_bytes(take as u64);

            if expected == Some(written) {
                break;
            }
        }
        file.flush().await?;

        if let Some(size) = expected {
            if written < size {
                return Err(DownloadError::TransferIo(format!(
                    "stream ended at {} of {} bytes for {}",
                    written,
                    size,
                    dest.display()
                )));
            }
        }
        Ok(TransferOutcome::Completed)
    }

    /// Walk the chunk sequence, appending each chunk and persisting the
    /// completed count after every append
    ///
    /// Ordering is the correctness core: a chunk is synced to the output
    /// file before the counter records it, so an interruption at any point
    /// can only under-count. The worst case on resume is re-fetching one
    /// chunk that is then appended again — never a gap.
    async fn run_chunked(
        &self,
        item: &DownloadItem,
        target_dir: &Path,
        state: &TransferState,
    ) -> Result<TransferOutcome, DownloadError> {
        let counter = ChunkCounter::for_item(&self.settings.state_dir, &item.name);
        let dest = target_dir.join(item.filename());
        let file_exists = dest.exists();

        let rule = resolver::rule_for_site(&item.source_website).ok_or_else(|| {
            DownloadError::Configuration(format!(
                "no chunk rule for site {}",
                item.source_website
            ))
        })?;

        let mut completed = match (counter.load().await?, file_exists) {
            (Some(count), true) => {
                debug!("Resuming {} from chunk {}", item.filename(), count);
                count
            }
            (Some(count), false) => {
                // Output file vanished underneath a live counter. Start the
                // file over but keep walking from the recorded position so
                // the sequence stays consistent with the source.
                tokio::fs::File::create(&dest).await.map_err(|e| {
                    DownloadError::Configuration(format!(
                        "cannot create output file {}: {}",
                        dest.display(),
                        e
                    ))
                })?;
                count
            }
            (None, true) => {
                // A finished download leaves the file without a counter.
                debug!("{} already downloaded", item.filename());
                return Ok(TransferOutcome::Completed);
            }
            (None, false) => {
                tokio::fs::File::create(&dest).await.map_err(|e| {
                    DownloadError::Configuration(format!(
                        "cannot create output file {}: {}",
                        dest.display(),
                        e
                    ))
                })?;
                counter.store(0).await?;
                0
            }
        };

        state.set_chunks(completed);

        let mut file = OpenOptions::new().append(true).open(&dest).await?;

        loop {
            if self.is_cancelled() {
                return Ok(TransferOutcome::Cancelled);
            }

            let url = match resolver::next_chunk_url(
                rule,
                item,
                completed,
                self.transport.as_ref(),
                &self.cancelled,
            )
            .await
            {
                Some(url) => url,
                None => break,
            };

            let chunk = match self.fetch_chunk(&url).await? {
                Some(chunk) => chunk,
                None => break,
            };
            if self.is_cancelled() {
                return Ok(TransferOutcome::Cancelled);
            }

            file.write_all(&chunk).await?;
            file.sync_data().await?;

            completed += 1;
            counter.store(completed).await?;
            state.add_bytes(chunk.len() as u64);
            state.set_chunks(completed);
        }

        // The resolver also yields nothing when cancellation trips during a
        // manifest scan; that must keep the counter, not end the sequence.
        if self.is_cancelled() {
            return Ok(TransferOutcome::Cancelled);
        }

        // The sequence is exhausted; the counter has served its purpose.
        counter.delete().await?;
        Ok(TransferOutcome::Completed)
    }

    /// Fetch one whole chunk into memory, or `None` when the sequence ended
    async fn fetch_chunk(&self, url: &str) -> Result<Option<Vec<u8>>, DownloadError> {
        let mut stream = match self.transport.open(url, &[]).await {
            Ok(s) => s,
            Err(FetchError::NotFound(_)) => {
                debug!("Chunk sequence exhausted at {}", url);
                return Ok(None);
            }
            Err(FetchError::Io(msg)) => return Err(DownloadError::TransferIo(msg)),
        };

        let mut chunk = Vec::new();
        let mut buf = vec![0u8; self.settings.chunk_buffer_size];
        loop {
            if self.is_cancelled() {
                // Drop the partial chunk; it was never appended.
                return Ok(Some(Vec::new()));
            }
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            chunk.extend_from_slice(&buf[..n]);
        }
        Ok(Some(chunk))
    }

    /// Two sequential plain transfers: the video track, then the audio track
    ///
    /// Tracks land in separate files named `<name>.video.<ext>` and
    /// `<name>.audio.<ext>`; muxing them is the caller's concern.
    async fn run_combined(
        &self,
        item: &DownloadItem,
        target_dir: &Path,
        state: &TransferState,
    ) -> Result<TransferOutcome, DownloadError> {
        let audio_url = item.audio_url.as_deref().ok_or_else(|| {
            DownloadError::Configuration(format!("no audio stream for {}", item.name))
        })?;

        let video_dest = target_dir.join(format!("{}.video.{}", item.name, item.ext));
        let expected = (item.size > 0).then_some(item.size);
        match self
            .run_default(&item.video_url, &video_dest, expected, state)
            .await?
        {
            TransferOutcome::Completed => {}
            TransferOutcome::Cancelled => return Ok(TransferOutcome::Cancelled),
        }

        let audio_dest = target_dir.join(format!("{}.audio.{}", item.name, item.ext));
        self.run_default(audio_url, &audio_dest, None, state).await
    }
}
