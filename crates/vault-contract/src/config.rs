use std::path::PathBuf;

const DEFAULT_GATEWAY_PORT: u16 = 9900;
const DEFAULT_CDP_URL: &str = "http://localhost:9222";

/// Centralized process configuration, resolved once from environment variables
/// with the defaults named in the external-interfaces section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
    pub gateway_port: u16,
    pub cdp_url: String,
}

impl VaultConfig {
    /// Resolves configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            data_dir: resolve_data_dir(),
            gateway_port: resolve_gateway_port(),
            cdp_url: std::env::var("VAULT_CDP_URL").unwrap_or_else(|_| DEFAULT_CDP_URL.to_string()),
        }
    }
}

fn resolve_data_dir() -> PathBuf {
    if let Ok(explicit) = std::env::var("VAULT_DATA_DIR") {
        if !explicit.trim().is_empty() {
            return PathBuf::from(explicit);
        }
    }
    dirs_home().unwrap_or_else(|| PathBuf::from(".")).join(".vault-mcp")
}

fn resolve_gateway_port() -> u16 {
    std::env::var("VAULT_GATEWAY_PORT")
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_GATEWAY_PORT)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
