//! Applied-migration ledger.
//!
//! One directory per applied migration under `<repo>/v2/migration-logs/`,
//! holding four artifacts: `metadata.json` (identity, statistics, status),
//! `changes.json` (counts plus a human-readable summary), `diff.patch`
//! (captured store diff, may be absent), and `logs.txt` (the execution
//! transcript). The presence of `metadata.json` is the sole source of truth
//! for "this migration has been applied".
//!
//! Applied lookups are cached in memory; the cache is process-local and can
//! go stale against external writers. Anyone who writes a ledger entry and
//! needs read-after-write consistency in the same process must invalidate.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::{MigrationDescriptor, MigrationResult};

const METADATA_FILE: &str = "metadata.json";
const CHANGES_FILE: &str = "changes.json";
const DIFF_FILE: &str = "diff.patch";
const LOGS_FILE: &str = "logs.txt";

/// Persisted per-migration metadata record
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerMetadata {
    pub migration_name: String,
    pub author: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub entities_created: i64,
    pub relationships_created: i64,
    pub version_records_created: i64,
    pub status: String,
    pub diff_captured: bool,
}

/// Persisted change summary record
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerChanges {
    pub entities_created: i64,
    pub relationships_created: i64,
    pub version_records_created: i64,
    pub summary: String,
}

pub struct MigrationLedger {
    root: PathBuf,
    applied_cache: Mutex<Option<BTreeSet<String>>>,
}

impl MigrationLedger {
    /// Ledger rooted at `<repo>/v2/migration-logs`
    pub fn new(db_repo_path: impl Into<PathBuf>) -> Self {
        Self {
            root: db_repo_path.into().join("v2").join("migration-logs"),
            applied_cache: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, full_name: &str) -> PathBuf {
        self.root.join(full_name)
    }

    /// Names of all applied migrations. Cached after the first scan until
    /// [`invalidate_cache`](Self::invalidate_cache) is called. A missing
    /// ledger root means nothing has been applied.
    pub fn get_applied(&self) -> BTreeSet<String> {
        let mut cache = self.applied_cache.lock().unwrap();
        if let Some(applied) = cache.as_ref() {
            debug!(count = applied.len(), "Returning cached applied migrations");
            return applied.clone();
        }

        let applied = self.scan_applied();
        info!(count = applied.len(), "Found applied migrations in ledger");
        *cache = Some(applied.clone());
        applied
    }

    fn scan_applied(&self) -> BTreeSet<String> {
        let mut applied = BTreeSet::new();

        if !self.root.exists() {
            debug!(root = %self.root.display(), "Ledger root does not exist");
            return applied;
        }

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Failed to scan ledger");
                return applied;
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() && path.join(METADATA_FILE).exists() {
                applied.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }

        applied
    }

    /// Drop the cached applied set, forcing the next lookup to rescan disk
    pub fn invalidate_cache(&self) {
        debug!("Invalidating applied-migrations cache");
        *self.applied_cache.lock().unwrap() = None;
    }

    pub fn is_applied(&self, migration: &MigrationDescriptor) -> bool {
        self.get_applied().contains(&migration.full_name())
    }

    /// Catalog entries without a ledger record, preserving catalog order
    pub fn pending<'a>(
        &self,
        catalog: &'a [MigrationDescriptor],
    ) -> Vec<&'a MigrationDescriptor> {
        let applied = self.get_applied();
        catalog
            .iter()
            .filter(|m| !applied.contains(&m.full_name()))
            .collect()
    }

    /// Write one durable ledger entry. This is the commit point that flips
    /// a migration from pending to applied; it overwrites any previous entry
    /// for the same name (forced re-runs are last-write-wins).
    pub fn store_entry(
        &self,
        migration: &MigrationDescriptor,
        result: &MigrationResult,
        diff: Option<&str>,
    ) -> Result<()> {
        let full_name = migration.full_name();
        let entry_dir = self.entry_dir(&full_name);

        fs::create_dir_all(&entry_dir)
            .with_context(|| format!("failed to create ledger entry {}", entry_dir.display()))?;

        info!(migration = %full_name, dir = %entry_dir.display(), "Storing migration log");

        let executed_at = Utc::now();

        let metadata = LedgerMetadata {
            migration_name: full_name.clone(),
            author: migration.author.clone(),
            date: migration.date.map(|d| d.format("%Y-%m-%d").to_string()),
            description: migration.description.clone(),
            executed_at,
            duration_seconds: result.duration_seconds,
            entities_created: result.entities_created,
            relationships_created: result.relationships_created,
            version_records_created: result.version_records_created,
            status: result.status.as_str().to_string(),
            diff_captured: diff.is_some(),
        };
        write_json(&entry_dir.join(METADATA_FILE), &metadata)?;

        let changes = LedgerChanges {
            entities_created: result.entities_created,
            relationships_created: result.relationships_created,
            version_records_created: result.version_records_created,
            summary: format!(
                "Created {} entities and {} relationships ({} version records)",
                result.entities_created,
                result.relationships_created,
                result.version_records_created
            ),
        };
        write_json(&entry_dir.join(CHANGES_FILE), &changes)?;

        if let Some(diff) = diff {
            fs::write(entry_dir.join(DIFF_FILE), diff)
                .with_context(|| format!("failed to write diff for {full_name}"))?;
        }

        let mut transcript = String::new();
        transcript.push_str(&format!("Migration: {full_name}\n"));
        transcript.push_str(&format!("Executed at: {}\n", executed_at.to_rfc3339()));
        transcript.push_str(&format!("Duration: {:.1}s\n", result.duration_seconds));
        transcript.push_str(&format!("\n{}\n", "=".repeat(80)));
        transcript.push_str("Execution Logs:\n");
        transcript.push_str(&format!("{}\n\n", "=".repeat(80)));
        for line in &result.logs {
            transcript.push_str(line);
            transcript.push('\n');
        }
        fs::write(entry_dir.join(LOGS_FILE), transcript)
            .with_context(|| format!("failed to write logs for {full_name}"))?;

        // This process just became a writer; keep its own reads consistent
        self.invalidate_cache();

        info!(migration = %full_name, "Migration log stored");
        Ok(())
    }

    /// Read back a stored metadata record (CLI status display)
    pub fn read_metadata(&self, full_name: &str) -> Result<LedgerMetadata> {
        let path = self.entry_dir(full_name).join(METADATA_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid ledger metadata {}", path.display()))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::models::MigrationStatus;
    use tempfile::tempdir;

    fn descriptor(ordinal: u32, slug: &str) -> MigrationDescriptor {
        MigrationDescriptor {
            ordinal,
            slug: slug.to_string(),
            folder_path: PathBuf::from("unused"),
            manifest_path: PathBuf::from("unused"),
            author: Some("A".to_string()),
            date: None,
            description: Some("D".to_string()),
        }
    }

    fn completed_result(migration: &MigrationDescriptor) -> MigrationResult {
        let mut result = MigrationResult::new(migration.clone());
        result.status = MigrationStatus::Completed;
        result.entities_created = 2;
        result.logs.push("did things".to_string());
        result
    }

    fn fake_entry(root: &Path, name: &str) {
        let dir = root.join("v2").join("migration-logs").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(METADATA_FILE), "{}").unwrap();
    }

    #[test]
    fn test_missing_root_is_empty_not_an_error() {
        let dir = tempdir().unwrap();
        let ledger = MigrationLedger::new(dir.path());
        assert!(ledger.get_applied().is_empty());
    }

    #[test]
    fn test_pending_preserves_catalog_order() {
        let dir = tempdir().unwrap();
        fake_entry(dir.path(), "000-a");

        let ledger = MigrationLedger::new(dir.path());
        let catalog = vec![descriptor(0, "a"), descriptor(1, "b"), descriptor(2, "c")];
        let pending: Vec<String> = ledger
            .pending(&catalog)
            .iter()
            .map(|m| m.full_name())
            .collect();
        assert_eq!(pending, vec!["001-b", "002-c"]);
    }

    #[test]
    fn test_cache_is_stale_until_invalidated() {
        let dir = tempdir().unwrap();
        let ledger = MigrationLedger::new(dir.path());

        // Prime the cache on an empty ledger
        assert!(ledger.get_applied().is_empty());

        // Another writer adds an entry behind our back
        fake_entry(dir.path(), "000-a");
        assert!(
            ledger.get_applied().is_empty(),
            "cached result must not see the external write"
        );

        ledger.invalidate_cache();
        assert!(ledger.get_applied().contains("000-a"));
    }

    #[test]
    fn test_store_entry_writes_all_artifacts_and_invalidates() {
        let dir = tempdir().unwrap();
        let ledger = MigrationLedger::new(dir.path());
        let migration = descriptor(0, "a");

        // Prime the cache before writing
        assert!(!ledger.is_applied(&migration));

        let result = completed_result(&migration);
        ledger
            .store_entry(&migration, &result, Some("--- a\n+++ b\n"))
            .unwrap();

        // Same-process read-after-write consistency via invalidation
        assert!(ledger.is_applied(&migration));

        let entry = ledger.entry_dir("000-a");
        assert!(entry.join(METADATA_FILE).exists());
        assert!(entry.join(CHANGES_FILE).exists());
        assert!(entry.join(DIFF_FILE).exists());
        assert!(entry.join(LOGS_FILE).exists());

        let metadata = ledger.read_metadata("000-a").unwrap();
        assert_eq!(metadata.status, "completed");
        assert_eq!(metadata.entities_created, 2);
        assert!(metadata.diff_captured);

        let transcript = fs::read_to_string(entry.join(LOGS_FILE)).unwrap();
        assert!(transcript.starts_with("Migration: 000-a\n"));
        assert!(transcript.contains("did things"));
    }

    #[test]
    fn test_store_entry_without_diff_omits_diff_file() {
        let dir = tempdir().unwrap();
        let ledger = MigrationLedger::new(dir.path());
        let migration = descriptor(1, "no-diff");

        ledger
            .store_entry(&migration, &completed_result(&migration), None)
            .unwrap();

        let entry = ledger.entry_dir("001-no-diff");
        assert!(entry.join(METADATA_FILE).exists());
        assert!(!entry.join(DIFF_FILE).exists());

        let metadata = ledger.read_metadata("001-no-diff").unwrap();
        assert!(!metadata.diff_captured);
    }
}
