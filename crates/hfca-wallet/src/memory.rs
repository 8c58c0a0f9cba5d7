//! In-memory wallet storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::WalletError;
use crate::store::{validate_label, WalletStore};

/// Wallet storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryWalletStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get(&self, label: &str) -> Result<Option<String>, WalletError> {
        validate_label(label)?;
        Ok(self.entries.read().await.get(label).cloned())
    }

    async fn put(&self, label: &str, blob: String) -> Result<(), WalletError> {
        validate_label(label)?;
        self.entries.write().await.insert(label.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, label: &str) -> Result<(), WalletError> {
        validate_label(label)?;
        self.entries.write().await.remove(label);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, WalletError> {
        let mut labels: Vec<String> = self.entries.read().await.keys().cloned().collect();
        labels.sort();
        Ok(labels)
    }
}
