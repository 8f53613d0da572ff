use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use anyhow::{bail, Context, Result};
use rand::RngCore;
use vault_core::{ensure_private_dir, set_private_file_mode, write_bytes_atomic};

const SCRYPT_SALT: &str = "vault-mcp-salt";
const MASTER_KEY_FILE: &str = ".master-key";
const MASTER_KEY_LEN: usize = 32;

/// Scrypt cost parameters for deriving the master key from `VAULT_MASTER_KEY`.
///
/// Kept as a tunable struct rather than hardcoded constants per the resolved
/// "key derivation parameters" open question — rotation of the fixed salt
/// itself remains a non-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MasterKeyParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for MasterKeyParams {
    fn default() -> Self {
        // N=2^14, r=8, p=1: scrypt's own "interactive" recommendation.
        Self {
            log_n: 14,
            r: 8,
            p: 1,
        }
    }
}

type CacheKey = (Option<String>, PathBuf, MasterKeyParams);

static CACHE: OnceLock<Mutex<HashMap<CacheKey, [u8; MASTER_KEY_LEN]>>> = OnceLock::new();

/// Resolves the 32-byte data-encryption key for `data_dir`, using the default
/// scrypt cost parameters. Memoized per `(VAULT_MASTER_KEY, data_dir)`.
pub fn obtain_master_key(data_dir: &Path) -> Result<[u8; MASTER_KEY_LEN]> {
    obtain_master_key_with_params(data_dir, MasterKeyParams::default())
}

/// Like [`obtain_master_key`] but with explicit scrypt cost parameters.
pub fn obtain_master_key_with_params(
    data_dir: &Path,
    params: MasterKeyParams,
) -> Result<[u8; MASTER_KEY_LEN]> {
    let env_value = std::env::var("VAULT_MASTER_KEY").ok();
    let cache_key: CacheKey = (env_value.clone(), data_dir.to_path_buf(), params);

    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Some(key) = cache
        .lock()
        .expect("master key cache mutex poisoned")
        .get(&cache_key)
    {
        return Ok(*key);
    }

    let key = resolve_master_key(env_value.as_deref(), data_dir, params)?;
    cache
        .lock()
        .expect("master key cache mutex poisoned")
        .insert(cache_key, key);
    Ok(key)
}

fn resolve_master_key(
    env_value: Option<&str>,
    data_dir: &Path,
    params: MasterKeyParams,
) -> Result<[u8; MASTER_KEY_LEN]> {
    if let Some(raw) = env_value {
        return derive_scrypt_key(raw, params);
    }

    let key_path = data_dir.join(MASTER_KEY_FILE);
    if key_path.exists() {
        let bytes = std::fs::read(&key_path)
            .with_context(|| format!("failed to read {}", key_path.display()))?;
        if bytes.len() != MASTER_KEY_LEN {
            bail!(
                "master key file {} has {} bytes, expected {}",
                key_path.display(),
                bytes.len(),
                MASTER_KEY_LEN
            );
        }
        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(&bytes);
        return Ok(key);
    }

    ensure_private_dir(data_dir)?;
    let mut key = [0u8; MASTER_KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut key);
    write_bytes_atomic(&key_path, &key)
        .with_context(|| format!("failed to write {}", key_path.display()))?;
    set_private_file_mode(&key_path)?;
    tracing::warn!(
        path = %key_path.display(),
        "generated a new vault-mcp master key; back this file up, losing it makes every stored credential unrecoverable"
    );
    Ok(key)
}

fn derive_scrypt_key(raw: &str, params: MasterKeyParams) -> Result<[u8; MASTER_KEY_LEN]> {
    let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, MASTER_KEY_LEN)
        .context("invalid scrypt parameters")?;
    let mut out = [0u8; MASTER_KEY_LEN];
    scrypt::scrypt(raw.as_bytes(), SCRYPT_SALT.as_bytes(), &scrypt_params, &mut out)
        .map_err(|error| anyhow::anyhow!("scrypt derivation failed: {error}"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // VAULT_MASTER_KEY is process-global; serialize tests that touch it.
    static ENV_LOCK: StdMutex<()> = StdMutex::new(());

    #[test]
    fn unit_scrypt_derivation_is_deterministic_for_same_input() {
        let params = MasterKeyParams {
            log_n: 4,
            r: 1,
            p: 1,
        };
        let first = derive_scrypt_key("hunter2", params).expect("derive");
        let second = derive_scrypt_key("hunter2", params).expect("derive");
        assert_eq!(first, second);
    }

    #[test]
    fn regression_scrypt_derivation_differs_across_passphrases() {
        let params = MasterKeyParams {
            log_n: 4,
            r: 1,
            p: 1,
        };
        let first = derive_scrypt_key("hunter2", params).expect("derive");
        let second = derive_scrypt_key("hunter3", params).expect("derive");
        assert_ne!(first, second);
    }

    #[test]
    fn functional_obtain_master_key_generates_and_persists_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("VAULT_MASTER_KEY");
        let tempdir = tempfile::tempdir().expect("tempdir");
        let data_dir = tempdir.path().join("store-a");

        let first = obtain_master_key(&data_dir).expect("first resolution");
        let key_path = data_dir.join(MASTER_KEY_FILE);
        assert!(key_path.exists());

        // A fresh process (no cache) reading the same file must agree.
        let persisted = std::fs::read(&key_path).expect("read key file");
        assert_eq!(persisted.len(), MASTER_KEY_LEN);
        assert_eq!(&persisted[..], &first[..]);
    }

    #[test]
    fn integration_obtain_master_key_prefers_env_var_and_is_memoized() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("VAULT_MASTER_KEY", "integration-test-key");
        let tempdir = tempfile::tempdir().expect("tempdir");
        let data_dir = tempdir.path().join("store-b");

        let first = obtain_master_key(&data_dir).expect("first resolution");
        // No key file should be written when the env var is authoritative.
        assert!(!data_dir.join(MASTER_KEY_FILE).exists());

        let second = obtain_master_key(&data_dir).expect("memoized resolution");
        assert_eq!(first, second);
        std::env::remove_var("VAULT_MASTER_KEY");
    }
}
