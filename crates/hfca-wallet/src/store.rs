//! Storage seam behind the wallet.

use async_trait::async_trait;

use crate::error::WalletError;

/// Keyed storage for encoded identity blobs.
///
/// Implement this trait to keep identities somewhere other than the local
/// filesystem or memory.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// The blob stored under `label`, if any.
    async fn get(&self, label: &str) -> Result<Option<String>, WalletError>;

    /// Store `blob` under `label`, replacing any previous value.
    async fn put(&self, label: &str, blob: String) -> Result<(), WalletError>;

    /// Delete `label`. Removing an absent label succeeds.
    async fn remove(&self, label: &str) -> Result<(), WalletError>;

    /// All stored labels.
    async fn list(&self) -> Result<Vec<String>, WalletError>;
}

/// Reject labels that are empty or could address another location.
pub fn validate_label(label: &str) -> Result<(), WalletError> {
    let invalid = label.is_empty()
        || label == "."
        || label == ".."
        || label.contains(['/', '\\', '\0']);
    if invalid {
        return Err(WalletError::InvalidLabel(label.to_string()));
    }
    Ok(())
}
