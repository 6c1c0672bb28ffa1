//! vidfetch - resumable downloads for captured video and audio streams
//!
//! The crate moves one download item at a time from the network to disk.
//! Plain items stream into a file with byte-range resume; chunked items
//! walk a site-specific chunk sequence with a persisted progress counter
//! so an interrupted download continues where it stopped.

pub mod downloader;
pub mod queue;
pub mod storage;
pub mod transport;
pub mod utils;

pub use downloader::{CancelHandle, TransferEngine, TransferOutcome, TransferProgress};
pub use queue::{DownloadItem, DownloadPhase, PhaseSignal};
pub use storage::StorageLocator;
pub use transport::{HttpTransport, ReqwestTransport};
pub use utils::{DownloadError, Settings};
