//! Labelled identity wallet.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::WalletError;
use crate::fs::FsWalletStore;
use crate::identity::X509Identity;
use crate::store::{validate_label, WalletStore};

/// Identities keyed by label, persisted through a [`WalletStore`].
#[derive(Clone)]
pub struct Wallet {
    store: Arc<dyn WalletStore>,
}

impl Wallet {
    pub fn new(store: impl WalletStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wallet backed by a directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WalletError> {
        Ok(Self::new(FsWalletStore::open(dir).await?))
    }

    /// Store `identity` under `label`, replacing any previous identity.
    pub async fn put(&self, label: &str, identity: &X509Identity) -> Result<(), WalletError> {
        validate_label(label)?;
        let blob = identity.encode()?;
        self.store.put(label, blob).await?;
        info!(label = %label, msp_id = %identity.msp_id, "Stored identity");
        Ok(())
    }

    /// Load the identity stored under `label`.
    pub async fn get(&self, label: &str) -> Result<X509Identity, WalletError> {
        validate_label(label)?;
        let blob = self
            .store
            .get(label)
            .await?
            .ok_or_else(|| WalletError::NotFound(label.to_string()))?;
        debug!(label = %label, "Loaded identity");
        X509Identity::decode(&blob)
    }

    /// Delete the identity under `label`, if present.
    pub async fn remove(&self, label: &str) -> Result<(), WalletError> {
        validate_label(label)?;
        self.store.remove(label).await?;
        info!(label = %label, "Removed identity");
        Ok(())
    }

    /// Labels of all stored identities.
    pub async fn list(&self) -> Result<Vec<String>, WalletError> {
        self.store.list().await
    }

    pub async fn exists(&self, label: &str) -> Result<bool, WalletError> {
        validate_label(label)?;
        Ok(self.store.get(label).await?.is_some())
    }
}
