//! Shared domain types for the vault-mcp secret-isolation kernel.
//!
//! Every higher crate (store, audit, tools, gateway, cli) depends on this one
//! so the wire shapes of credentials, errors, and configuration are defined
//! exactly once.

pub mod config;
pub mod credential;
pub mod error;
pub mod sanitize;

pub use config::VaultConfig;
pub use credential::{CredentialMetadata, CredentialRecord, LoginSelectors, SecretPayload, ServiceType};
pub use error::{VaultError, VaultResult};
pub use sanitize::sanitize_text;
