//! Directory-backed wallet storage: one `<label>.id` file per identity.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::WalletError;
use crate::store::{validate_label, WalletStore};

const EXTENSION: &str = "id";
const TMP_EXTENSION: &str = "tmp";

/// Wallet storage in a local directory.
#[derive(Debug, Clone)]
pub struct FsWalletStore {
    dir: PathBuf,
}

impl FsWalletStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened wallet directory");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, label: &str) -> Result<PathBuf, WalletError> {
        validate_label(label)?;
        Ok(self.dir.join(format!("{}.{}", label, EXTENSION)))
    }
}

#[async_trait]
impl WalletStore for FsWalletStore {
    async fn get(&self, label: &str) -> Result<Option<String>, WalletError> {
        let path = self.path_for(label)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, label: &str, blob: String) -> Result<(), WalletError> {
        let path = self.path_for(label)?;
        // Each write gets its own temp file; the rename publishes it whole.
        let tmp = self.dir.join(format!(
            ".{}.{:016x}.{}",
            label,
            rand::random::<u64>(),
            TMP_EXTENSION
        ));
        if let Err(e) = tokio::fs::write(&tmp, blob).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, label: &str) -> Result<(), WalletError> {
        let path = self.path_for(label)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, WalletError> {
        let mut labels = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(label) = path.file_stem().and_then(|s| s.to_str()) {
                labels.push(label.to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("wallet");
        let store = FsWalletStore::open(&dir).await.unwrap();
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let tmp = TempDir::new().unwrap();
        let store = FsWalletStore::open(tmp.path()).await.unwrap();

        store.put("admin", "blob-1".to_string()).await.unwrap();
        assert!(tmp.path().join("admin.id").is_file());
        assert_eq!(store.get("admin").await.unwrap().as_deref(), Some("blob-1"));

        store.put("admin", "blob-2".to_string()).await.unwrap();
        assert_eq!(store.get("admin").await.unwrap().as_deref(), Some("blob-2"));

        store.remove("admin").await.unwrap();
        assert!(store.get("admin").await.unwrap().is_none());
        store.remove("admin").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_ignores_other_files() {
        let tmp = TempDir::new().unwrap();
        let store = FsWalletStore::open(tmp.path()).await.unwrap();
        store.put("user1", "b".to_string()).await.unwrap();
        store.put("admin", "a".to_string()).await.unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["admin", "user1"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_keep_one_whole_blob() {
        let tmp = TempDir::new().unwrap();
        let store = FsWalletStore::open(tmp.path()).await.unwrap();
        let blobs: Vec<String> = (0..8)
            .map(|i| char::from(b'a' + i as u8).to_string().repeat(1000 * (i + 1)))
            .collect();

        let mut handles = Vec::new();
        for blob in blobs.clone() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    store.put("admin", blob.clone()).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.get("admin").await.unwrap().unwrap();
        assert!(blobs.contains(&stored));

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(tmp.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["admin.id"]);
    }

    #[tokio::test]
    async fn test_rejects_path_labels() {
        let tmp = TempDir::new().unwrap();
        let store = FsWalletStore::open(tmp.path()).await.unwrap();
        assert!(matches!(
            store.put("../escape", "x".to_string()).await,
            Err(WalletError::InvalidLabel(_))
        ));
        assert!(matches!(
            store.get("").await,
            Err(WalletError::InvalidLabel(_))
        ));
    }
}
