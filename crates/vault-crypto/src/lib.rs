//! Envelope encryption and master-key management for the credential store.
//!
//! Credentials are encrypted with AES-256-GCM under a single data-encryption
//! key. That key is either supplied directly (derived from `VAULT_MASTER_KEY`
//! via scrypt) or generated once and cached on disk under the vault's data
//! directory. Nothing in this crate ever logs a plaintext secret.

pub mod cipher;
pub mod master_key;

pub use cipher::{decrypt, encrypt, VaultCipher};
pub use master_key::{obtain_master_key, obtain_master_key_with_params, MasterKeyParams};
