//! File store collaborator.
//!
//! The portal's upload mechanics (multipart parsing, size limits, virus
//! scanning) live outside this core; the engine only needs to persist
//! bytes, get back a checksum captured at store time, and re-read the
//! bytes for integrity verification before a document is attached.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

use gradus_core::integrity::sha256_hex;

/// Result of storing a blob: where it went and its digest at write time.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: String,
    pub checksum: String,
}

/// Stores and retrieves document blobs.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `bytes`, returning the storage path and checksum.
    async fn store(&self, bytes: &[u8]) -> io::Result<StoredFile>;

    /// Read back the blob at `path`.
    async fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// LocalFileStore
// ---------------------------------------------------------------------------

/// Filesystem-backed store: blobs land under a root directory with
/// generated names, the relative name is the storage path.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, bytes: &[u8]) -> io::Result<StoredFile> {
        tokio::fs::create_dir_all(&self.root).await?;
        let name = uuid::Uuid::new_v4().to_string();
        tokio::fs::write(self.root.join(&name), bytes).await?;
        Ok(StoredFile {
            path: name,
            checksum: sha256_hex(bytes),
        })
    }

    async fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.root.join(path)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gradus_core::integrity;

    #[tokio::test]
    async fn store_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let stored = store.store(b"thesis draft").await.unwrap();
        let bytes = store.read(&stored.path).await.unwrap();
        assert_eq!(bytes, b"thesis draft");
        assert!(integrity::verify(&stored.checksum, &bytes));
    }

    #[tokio::test]
    async fn checksum_detects_on_disk_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let stored = store.store(b"original contents").await.unwrap();
        tokio::fs::write(dir.path().join(&stored.path), b"original contentsX")
            .await
            .unwrap();

        let bytes = store.read(&stored.path).await.unwrap();
        assert!(!integrity::verify(&stored.checksum, &bytes));
    }

    #[tokio::test]
    async fn read_of_unknown_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(store.read("no-such-blob").await.is_err());
    }

    #[tokio::test]
    async fn distinct_blobs_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let a = store.store(b"a").await.unwrap();
        let b = store.store(b"a").await.unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(a.checksum, b.checksum);
    }
}
