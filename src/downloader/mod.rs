//! Download engine and its supporting parts

pub mod counter;
pub mod engine;
pub mod notifier;
pub mod progress;
pub mod resolver;

pub use counter::ChunkCounter;
pub use engine::{CancelHandle, TransferEngine, TransferOutcome};
pub use notifier::ProgressNotifier;
pub use progress::{TransferProgress, TransferState};
