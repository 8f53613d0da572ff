//! Foundational low-level utilities shared across vault-mcp crates.
//!
//! Provides atomic file-write helpers, Unix permission helpers, and time
//! utilities used by the credential store, the audit log, and the master-key
//! provider.

pub mod atomic_io;
pub mod fs_perms;
pub mod time_utils;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use fs_perms::{ensure_private_dir, set_private_file_mode};
pub use time_utils::{current_unix_timestamp_ms, now_iso8601};
