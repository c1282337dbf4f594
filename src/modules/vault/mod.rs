//! Secret vault access
//!
//! Provides the [`SecretVault`] seam used by the settings loader and an
//! Azure Key Vault implementation backed by plain REST calls.

mod key_vault_client;

pub use key_vault_client::{KeyVaultClient, SecretVault, VaultError};
