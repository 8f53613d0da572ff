/// The recoverable error kinds enumerated in the error-handling design, plus
/// `Fatal` for the unrecoverable I/O failures that must abort the process.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("no credential named '{site_id}'")]
    NotFound { site_id: String },

    #[error("credential '{site_id}' is inactive")]
    Inactive { site_id: String },

    #[error("credential '{site_id}' is not {reason}")]
    WrongType { site_id: String, reason: String },

    #[error("credential '{site_id}' is misconfigured: {reason}")]
    Misconfigured { site_id: String, reason: String },

    #[error("decryption failed for '{site_id}': {reason}")]
    CryptoFailure { site_id: String, reason: String },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("operation timed out")]
    Timeout,

    #[error("site_id '{0}' already exists")]
    DuplicateSiteId(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl VaultError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(error: std::io::Error) -> Self {
        Self::Fatal(error.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(error: serde_json::Error) -> Self {
        Self::Fatal(format!("malformed json: {error}"))
    }
}

/// Any lower-layer failure reported as `anyhow::Error` (audit-log I/O, mainly)
/// is a process-level Fatal per §7 kind 8 — none of those callers have a more
/// specific `VaultError` variant to recover into.
impl From<anyhow::Error> for VaultError {
    fn from(error: anyhow::Error) -> Self {
        Self::Fatal(error.to_string())
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_fatal_errors_are_flagged_distinctly() {
        let fatal = VaultError::Fatal("disk full".to_string());
        let not_found = VaultError::NotFound {
            site_id: "x".to_string(),
        };
        assert!(fatal.is_fatal());
        assert!(!not_found.is_fatal());
    }

    #[test]
    fn unit_io_error_converts_to_fatal() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let vault_error: VaultError = io_error.into();
        assert!(vault_error.is_fatal());
    }
}
