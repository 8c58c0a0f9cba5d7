//! hfca identity wallet
//!
//! Persists enrolled X.509 identities under caller-chosen labels so they can
//! be reloaded and used as registrars without enrolling again.

pub mod error;
pub mod fs;
pub mod identity;
pub mod memory;
pub mod store;
pub mod wallet;

pub use error::WalletError;
pub use fs::FsWalletStore;
pub use identity::X509Identity;
pub use memory::InMemoryWalletStore;
pub use store::WalletStore;
pub use wallet::Wallet;
