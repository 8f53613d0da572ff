//! Encrypted, disk-backed storage of credential records.
//!
//! Wraps [`vault_crypto`] and [`vault_contract`] into a single CRUD surface
//! used by the tool surface and the entry-form gateway. Every secret that
//! touches disk passes through AES-256-GCM first; nothing here ever returns
//! a plaintext secret unless the caller explicitly asks for it via
//! [`CredentialStore::secret`].

pub mod credential_store;

pub use credential_store::CredentialStore;
