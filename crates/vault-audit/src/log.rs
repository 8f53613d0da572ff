use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use uuid::Uuid;
use vault_core::ensure_private_dir;

use crate::entry::{AuditAction, AuditEntry, AuditOutcome};

const AUDIT_LOG_FILE: &str = "audit.jsonl";
const GENESIS_HASH: &str = "genesis";

/// Result of [`AuditLog::verify_chain`]: whether the chain is intact, and if
/// not, the index of the first entry whose link or hash failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    pub broken_at: Option<usize>,
    pub total: usize,
}

/// Append-only, hash-chained audit trail for one vault data directory.
///
/// Appends are serialized through an internal mutex so concurrent callers
/// never race on `prev_hash` — without that, two concurrent appends could
/// both read the same `last_hash` and produce two entries claiming the same
/// predecessor, forking the chain.
pub struct AuditLog {
    path: PathBuf,
    last_hash: Mutex<String>,
    next_event_index: Mutex<usize>,
}

impl AuditLog {
    /// Opens (or creates) the audit log under `data_dir`, replaying it to
    /// recover the current chain tip and event counter.
    pub async fn init(data_dir: &Path) -> Result<Self> {
        ensure_private_dir(data_dir)?;
        let path = data_dir.join(AUDIT_LOG_FILE);
        if !path.exists() {
            tokio::fs::File::create(&path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            vault_core::set_private_file_mode(&path)?;
        }
        let entries = read_entries(&path).await?;
        let last_hash = entries
            .last()
            .map(|entry| entry.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let next_event_index = entries.len();
        Ok(Self {
            path,
            last_hash: Mutex::new(last_hash),
            next_event_index: Mutex::new(next_event_index),
        })
    }

    /// Appends a new entry, chained to the current tip, and returns it.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        action: AuditAction,
        site_id: Option<String>,
        credential_id: Option<Uuid>,
        bot_id: Option<String>,
        result: AuditOutcome,
        details: Option<serde_json::Value>,
    ) -> Result<AuditEntry> {
        let mut last_hash = self.last_hash.lock().await;
        let mut next_event_index = self.next_event_index.lock().await;

        let mut entry = AuditEntry {
            event_id: format!("evt_{:03}", *next_event_index + 1),
            timestamp: chrono::Utc::now(),
            action,
            site_id,
            credential_id,
            bot_id,
            result,
            details,
            prev_hash: last_hash.clone(),
            hash: String::new(),
        };
        entry.hash = hash_entry(&entry)?;

        let mut line = serde_json::to_string(&entry).context("failed to serialize audit entry")?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {} for append", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("failed to append audit entry")?;
        file.flush().await.context("failed to flush audit log")?;

        *last_hash = entry.hash.clone();
        *next_event_index += 1;
        tracing::info!(
            event_id = %entry.event_id,
            action = %entry.action,
            "audit entry appended"
        );
        Ok(entry)
    }

    /// Returns entries in append order, optionally filtered to one site.
    pub async fn entries(&self, site_id: Option<&str>) -> Result<Vec<AuditEntry>> {
        let entries = read_entries(&self.path).await?;
        Ok(match site_id {
            Some(site_id) => entries
                .into_iter()
                .filter(|entry| entry.site_id.as_deref() == Some(site_id))
                .collect(),
            None => entries,
        })
    }

    /// Recomputes every entry's hash and confirms the chain is unbroken.
    ///
    /// Reports `valid: true` if intact, or `valid: false` with `broken_at`
    /// set to the 1-based position of the first entry whose stored hash or
    /// `prev_hash` link does not match what was recorded.
    pub async fn verify_chain(&self) -> Result<ChainVerification> {
        let entries = read_entries(&self.path).await?;
        let total = entries.len();
        let mut expected_prev = GENESIS_HASH.to_string();
        for (index, entry) in entries.iter().enumerate() {
            if entry.prev_hash != expected_prev {
                tracing::warn!(event_id = %entry.event_id, "audit chain link mismatch");
                return Ok(ChainVerification {
                    valid: false,
                    broken_at: Some(index + 1),
                    total,
                });
            }
            let recomputed = hash_entry(entry)?;
            if recomputed != entry.hash {
                tracing::warn!(event_id = %entry.event_id, "audit entry hash mismatch");
                return Ok(ChainVerification {
                    valid: false,
                    broken_at: Some(index + 1),
                    total,
                });
            }
            expected_prev = entry.hash.clone();
        }
        Ok(ChainVerification {
            valid: true,
            broken_at: None,
            total,
        })
    }

    /// The hash of the most recently appended entry (empty string if none).
    pub async fn last_hash(&self) -> String {
        self.last_hash.lock().await.clone()
    }
}

fn hash_entry(entry: &AuditEntry) -> Result<String> {
    let canonical =
        serde_json::to_string(&entry.hashed_fields()).context("failed to canonicalize audit entry")?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

async fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();
    while let Some(line) = lines.next_line().await.context("failed to read audit log")? {
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry =
            serde_json::from_str(&line).context("failed to parse audit log entry")?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool) -> AuditOutcome {
        AuditOutcome {
            success,
            message: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn unit_append_then_entries_round_trips() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::init(tempdir.path()).await.expect("init");
        log.append(
            AuditAction::CredentialAdded,
            Some("example.com".to_string()),
            None,
            None,
            outcome(true),
            None,
        )
        .await
        .expect("append");

        let entries = log.entries(None).await.expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].site_id.as_deref(), Some("example.com"));
    }

    #[tokio::test]
    async fn functional_entries_filters_by_site() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::init(tempdir.path()).await.expect("init");
        log.append(
            AuditAction::Login,
            Some("a.com".to_string()),
            None,
            None,
            outcome(true),
            None,
        )
        .await
        .expect("append a");
        log.append(
            AuditAction::Login,
            Some("b.com".to_string()),
            None,
            None,
            outcome(true),
            None,
        )
        .await
        .expect("append b");

        let entries = log.entries(Some("b.com")).await.expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].site_id.as_deref(), Some("b.com"));
    }

    #[tokio::test]
    async fn integration_chain_links_successive_entries() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::init(tempdir.path()).await.expect("init");
        log.append(AuditAction::List, None, None, None, outcome(true), None)
            .await
            .expect("append 1");
        log.append(AuditAction::List, None, None, None, outcome(true), None)
            .await
            .expect("append 2");

        let entries = log.entries(None).await.expect("entries");
        assert_eq!(entries[1].prev_hash, entries[0].hash);
        let verification = log.verify_chain().await.expect("verify");
        assert!(verification.valid);
        assert_eq!(verification.total, 2);
    }

    #[tokio::test]
    async fn unit_append_assigns_zero_padded_sequential_event_ids() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::init(tempdir.path()).await.expect("init");
        let first = log
            .append(AuditAction::List, None, None, None, outcome(true), None)
            .await
            .expect("append 1");
        let second = log
            .append(AuditAction::List, None, None, None, outcome(true), None)
            .await
            .expect("append 2");
        assert_eq!(first.event_id, "evt_001");
        assert_eq!(second.event_id, "evt_002");
    }

    #[tokio::test]
    async fn regression_verify_chain_detects_tampering() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::init(tempdir.path()).await.expect("init");
        for _ in 0..3 {
            log.append(AuditAction::List, None, None, None, outcome(true), None)
                .await
                .expect("append");
        }

        let path = tempdir.path().join(AUDIT_LOG_FILE);
        let raw = tokio::fs::read_to_string(&path).await.expect("read");
        let tampered = raw.replacen("\"success\":true", "\"success\":false", 1);
        tokio::fs::write(&path, tampered).await.expect("write");

        let reopened = AuditLog::init(tempdir.path()).await.expect("reinit");
        let verification = reopened.verify_chain().await.expect("verify");
        assert!(!verification.valid);
        assert_eq!(verification.broken_at, Some(1));
        assert_eq!(verification.total, 3);
    }

    #[tokio::test]
    async fn regression_init_resumes_chain_tip_across_restarts() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        {
            let log = AuditLog::init(tempdir.path()).await.expect("init");
            log.append(AuditAction::List, None, None, None, outcome(true), None)
                .await
                .expect("append");
        }
        let reopened = AuditLog::init(tempdir.path()).await.expect("reinit");
        let tip = reopened.last_hash().await;
        assert!(!tip.is_empty());

        let entry = reopened
            .append(AuditAction::List, None, None, None, outcome(true), None)
            .await
            .expect("append after restart");
        assert_eq!(entry.prev_hash, tip);
        assert_eq!(entry.event_id, "evt_002");
    }
}
