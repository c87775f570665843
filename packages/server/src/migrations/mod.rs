//! Migration framework for versioned, replayable data imports
//!
//! This module provides the infrastructure for populating the entity store
//! from external sources with an auditable trail:
//!
//! - [`discovery`] scans the migrations root for `NNN-slug` folders and
//!   builds the ordered catalog.
//! - [`ledger`] records which migrations have been applied, one log
//!   directory per migration under `v2/migration-logs/`.
//! - [`registry`] maps migration names to compiled entry points; each
//!   migration implements the [`MigrationScript`] trait.
//! - [`runner`] executes migrations with a clean-state precondition,
//!   statistics capture, and durable post-run logging.
//!
//! # Adding a migration
//!
//! 1. Create `migrations/NNN-your-slug/` with a `migration.json` declaring
//!    author, date and description, plus any source data files.
//! 2. Implement [`MigrationScript`] in a module under [`scripts`] and
//!    register it in [`ScriptRegistry::builtin`].
//! 3. Run via `migrate_cli run NNN-your-slug`.
//!
//! Re-running the full catalog is always safe: applied migrations are
//! skipped by construction, and a run against a store with uncommitted
//! changes is refused outright.

pub mod context;
pub mod discovery;
pub mod ledger;
pub mod loader;
pub mod models;
pub mod registry;
pub mod runner;
pub mod scripts;

pub use context::MigrationContext;
pub use discovery::discover_migrations;
pub use ledger::MigrationLedger;
pub use loader::{load_migration, MigrationManifest, ResolvedMigration};
pub use models::{MigrationDescriptor, MigrationError, MigrationResult, MigrationStatus};
pub use registry::{MigrationScript, ScriptRegistry};
pub use runner::MigrationRunner;
