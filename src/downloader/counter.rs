//! Persistent chunk progress counter
//!
//! One 8-byte file per item: the number of chunks fully appended to the
//! output file, big-endian u64, rewritten whole on every update. The
//! counter is the only resume authority for chunked downloads — chunk
//! boundaries are opaque byte ranges, so the output file length tells us
//! nothing.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Handle to the on-disk progress counter for one download item
#[derive(Debug, Clone)]
pub struct ChunkCounter {
    path: PathBuf,
}

impl ChunkCounter {
    /// Counter file for `name` under the given state directory
    pub fn for_item(state_dir: &Path, name: &str) -> Self {
        Self {
            path: state_dir.join(format!("{}.dat", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the persisted count, or `None` if no counter file exists
    pub async fn load(&self) -> std::io::Result<Option<u64>> {
        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf).await?;
        Ok(Some(u64::from_be_bytes(buf)))
    }

    /// Overwrite the counter with `count` and sync it to disk
    ///
    /// Must only be called after the corresponding chunk append is durable;
    /// a crash between the two then under-counts, never over-counts.
    pub async fn store(&self, count: u64) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(&self.path).await?;
        file.write_all(&count.to_be_bytes()).await?;
        file.sync_all().await?;
        debug!("Persisted chunk counter {} -> {}", self.path.display(), count);
        Ok(())
    }

    /// Remove the counter file; missing file is not an error
    pub async fn delete(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Deleted chunk counter {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_absent_counter() {
        let temp = TempDir::new().unwrap();
        let counter = ChunkCounter::for_item(temp.path(), "clip");
        assert!(!counter.exists());
        assert_eq!(counter.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let counter = ChunkCounter::for_item(temp.path(), "clip");

        counter.store(42).await.unwrap();
        assert!(counter.exists());
        assert_eq!(counter.load().await.unwrap(), Some(42));

        // Whole-file overwrite, not append
        counter.store(43).await.unwrap();
        assert_eq!(counter.load().await.unwrap(), Some(43));
        let raw = std::fs::read(counter.path()).unwrap();
        assert_eq!(raw.len(), 8);
    }

    #[tokio::test]
    async fn test_file_format_is_big_endian() {
        let temp = TempDir::new().unwrap();
        let counter = ChunkCounter::for_item(temp.path(), "clip");

        counter.store(0x0102030405060708).await.unwrap();
        let raw = std::fs::read(counter.path()).unwrap();
        assert_eq!(raw, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let counter = ChunkCounter::for_item(temp.path(), "clip");

        counter.store(1).await.unwrap();
        counter.delete().await.unwrap();
        assert!(!counter.exists());

        // Deleting an already-missing counter succeeds
        counter.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_creates_state_dir_on_store() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("state").join("deep");
        let counter = ChunkCounter::for_item(&nested, "clip");

        counter.store(7).await.unwrap();
        assert_eq!(counter.load().await.unwrap(), Some(7));
    }
}
