//! Migration execution engine.
//!
//! Runs one migration at a time, strictly sequentially: the clean-state
//! precondition and the ledger commit must observe a non-interleaved view
//! of the store, so there is no parallel execution within an engine
//! instance (and a second process driving the same store is outside the
//! safety envelope).
//!
//! Per-run sequence: clean-state gate, applied-skip (unless forced), load,
//! counter baseline, execute, delta capture, then the ledger write as the
//! single commit point. A migration whose effects cannot be durably
//! recorded as applied is reported FAILED even when its body succeeded,
//! otherwise the next full-catalog run would execute it twice.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::kernel::traits::{
    BaseEntityDatabase, BasePublicationService, BaseScrapingService, BaseSearchService,
    BaseStateTracker,
};

use super::context::MigrationContext;
use super::ledger::MigrationLedger;
use super::loader::load_migration;
use super::models::{MigrationDescriptor, MigrationError, MigrationResult, MigrationStatus};
use super::registry::ScriptRegistry;

/// "Count everything" limit for delta snapshots
const COUNT_LIMIT: usize = 1_000_000;

pub struct MigrationRunner {
    publication: Arc<dyn BasePublicationService>,
    search: Arc<dyn BaseSearchService>,
    scraping: Arc<dyn BaseScrapingService>,
    db: Arc<dyn BaseEntityDatabase>,
    state: Arc<dyn BaseStateTracker>,
    registry: ScriptRegistry,
    ledger: MigrationLedger,
}

impl MigrationRunner {
    pub fn new(
        publication: Arc<dyn BasePublicationService>,
        search: Arc<dyn BaseSearchService>,
        scraping: Arc<dyn BaseScrapingService>,
        db: Arc<dyn BaseEntityDatabase>,
        state: Arc<dyn BaseStateTracker>,
        registry: ScriptRegistry,
        ledger: MigrationLedger,
    ) -> Self {
        Self {
            publication,
            search,
            scraping,
            db,
            state,
            registry,
            ledger,
        }
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Build the single-use capability bundle for one migration run
    pub fn create_context(&self, migration: &MigrationDescriptor) -> MigrationContext {
        MigrationContext::new(
            self.publication.clone(),
            self.search.clone(),
            self.scraping.clone(),
            self.db.clone(),
            &migration.folder_path,
        )
    }

    /// Execute one migration with determinism and clean-state checks.
    pub async fn run_migration(
        &self,
        migration: &MigrationDescriptor,
        dry_run: bool,
        auto_commit: bool,
        force: bool,
    ) -> MigrationResult {
        let full_name = migration.full_name();
        info!(migration = %full_name, dry_run, force, "Running migration");

        let mut result = MigrationResult::new(migration.clone());

        // Clean-state gate: runs regardless of force. A store with
        // uncommitted modifications would make this migration's effects
        // inseparable from unreviewed prior state.
        match self.state.is_clean().await {
            Ok(true) => {}
            Ok(false) => {
                let err = MigrationError::StoreDirty {
                    details: "commit or revert store changes before running migrations"
                        .to_string(),
                };
                error!(migration = %full_name, "{err}");
                result.logs.push(format!("ERROR: {err}"));
                result.status = MigrationStatus::Failed;
                result.error = Some(err);
                return result;
            }
            Err(e) => {
                let err = MigrationError::StateCheck(e);
                error!(migration = %full_name, "{err}");
                result.logs.push(format!("ERROR: {err}"));
                result.status = MigrationStatus::Failed;
                result.error = Some(err);
                return result;
            }
        }

        // Determinism check: an existing ledger entry means this migration
        // already ran; skipping here is what makes full-catalog re-runs
        // idempotent.
        let already_applied = self.ledger.is_applied(migration);
        if already_applied && !force {
            info!(migration = %full_name, "Migration already applied, skipping");
            result.status = MigrationStatus::Skipped;
            result
                .logs
                .push(format!("Migration {full_name} already applied, skipping"));
            return result;
        }
        if already_applied && force {
            warn!(migration = %full_name, "Force flag set: re-executing already-applied migration");
            result
                .logs
                .push("WARNING: Force re-execution of already-applied migration".to_string());
        }

        // Load the entry point; failures here never reach RUNNING
        let resolved = match load_migration(&self.registry, migration) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(migration = %full_name, error = %e, "Failed to load migration");
                result.logs.push(format!("Failed to load migration: {e}"));
                result.status = MigrationStatus::Failed;
                result.error = Some(e);
                return result;
            }
        };

        let context = self.create_context(migration);

        // Baseline counters; a transiently unavailable store degrades to
        // zero rather than aborting the run
        let entities_before = self.count_entities().await;
        let relationships_before = self.count_relationships().await;
        let versions_before = self.count_version_records().await;

        info!(migration = %full_name, "Executing migration");
        let start = Instant::now();

        match resolved.script.run(&context).await {
            Ok(()) => {
                result.duration_seconds = start.elapsed().as_secs_f64();

                let entities_after = self.count_entities().await;
                let relationships_after = self.count_relationships().await;
                let versions_after = self.count_version_records().await;

                result.entities_created = entities_after - entities_before;
                result.relationships_created = relationships_after - relationships_before;
                result.version_records_created = versions_after - versions_before;

                result.logs.extend(context.logs());
                result.status = MigrationStatus::Completed;

                info!(
                    migration = %full_name,
                    duration_seconds = format!("{:.1}", result.duration_seconds),
                    entities = result.entities_created,
                    relationships = result.relationships_created,
                    "Migration completed"
                );

                if auto_commit && !dry_run {
                    let diff = match self.state.capture_diff().await {
                        Ok(diff) => diff,
                        Err(e) => {
                            warn!(migration = %full_name, error = %e, "Diff capture unavailable");
                            None
                        }
                    };

                    if let Err(e) = self.ledger.store_entry(migration, &result, diff.as_deref()) {
                        // The migration ran but is not durably recorded as
                        // applied; reporting success would break re-run
                        // idempotence, so downgrade.
                        let err = MigrationError::LedgerWrite(e);
                        error!(migration = %full_name, "{err}");
                        result.logs.push(format!("ERROR: {err}"));
                        result.status = MigrationStatus::Failed;
                        result.error = Some(err);
                    }
                }
            }
            Err(e) => {
                result.duration_seconds = start.elapsed().as_secs_f64();
                result.logs.extend(context.logs());

                let trace = format!("{e:?}");
                result.logs.push(format!("ERROR: {e:#}"));
                result.logs.push(format!("Trace:\n{trace}"));

                error!(
                    migration = %full_name,
                    duration_seconds = format!("{:.1}", result.duration_seconds),
                    error = %e,
                    "Migration failed"
                );

                result.status = MigrationStatus::Failed;
                result.error = Some(MigrationError::Script(e));
            }
        }

        result
    }

    /// Execute migrations sequentially in the given order, never forcing.
    ///
    /// With `stop_on_failure`, a FAILED result halts the batch and the
    /// remaining migrations are not attempted (and absent from the returned
    /// results); otherwise the whole subset runs regardless of failures.
    pub async fn run_migrations(
        &self,
        migrations: &[MigrationDescriptor],
        dry_run: bool,
        auto_commit: bool,
        stop_on_failure: bool,
    ) -> Vec<MigrationResult> {
        info!(count = migrations.len(), "Running migration batch");

        let mut results = Vec::new();

        for (i, migration) in migrations.iter().enumerate() {
            info!(
                migration = %migration.full_name(),
                position = format!("{}/{}", i + 1, migrations.len()),
                "Processing migration"
            );

            let result = self.run_migration(migration, dry_run, auto_commit, false).await;
            let failed = result.is_failed();
            results.push(result);

            if failed && stop_on_failure {
                error!(
                    migration = %migration.full_name(),
                    "Stopping batch execution due to failure"
                );
                break;
            }
        }

        let completed = results
            .iter()
            .filter(|r| r.status == MigrationStatus::Completed)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.status == MigrationStatus::Skipped)
            .count();
        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(completed, skipped, failed, "Batch execution complete");

        results
    }

    async fn count_entities(&self) -> i64 {
        match self.db.list_entities(COUNT_LIMIT, None, None).await {
            Ok(entities) => entities.len() as i64,
            Err(e) => {
                warn!(error = %e, "Failed to count entities, treating as zero");
                0
            }
        }
    }

    async fn count_relationships(&self) -> i64 {
        match self.db.list_relationships(COUNT_LIMIT).await {
            Ok(relationships) => relationships.len() as i64,
            Err(e) => {
                warn!(error = %e, "Failed to count relationships, treating as zero");
                0
            }
        }
    }

    async fn count_version_records(&self) -> i64 {
        match self.db.count_version_records().await {
            Ok(count) => count as i64,
            Err(e) => {
                warn!(error = %e, "Failed to count version records, treating as zero");
                0
            }
        }
    }
}
