//! Migration identity, execution results, and the error taxonomy.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Static identity and metadata of one migration, produced by discovery
/// without executing anything.
#[derive(Debug, Clone)]
pub struct MigrationDescriptor {
    /// Execution order; zero-padded to 3 digits in folder names
    pub ordinal: u32,
    /// Kebab-case identifier, unique within the catalog
    pub slug: String,
    /// The migration's folder (source data lives here)
    pub folder_path: PathBuf,
    /// The metadata declaration file within the folder
    pub manifest_path: PathBuf,
    pub author: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl MigrationDescriptor {
    pub fn full_name(&self) -> String {
        format!("{:03}-{}", self.ordinal, self.slug)
    }
}

/// Terminal and in-flight states of one migration run.
///
/// A result is created RUNNING and transitions exactly once to a terminal
/// state; it never re-enters RUNNING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Running,
    Completed,
    Skipped,
    Failed,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one migration run attempt
#[derive(Debug)]
pub struct MigrationResult {
    pub migration: MigrationDescriptor,
    pub status: MigrationStatus,
    pub duration_seconds: f64,
    /// Signed deltas: a migration that deletes more than it creates reports
    /// a negative number, which is informative and kept as-is
    pub entities_created: i64,
    pub relationships_created: i64,
    pub version_records_created: i64,
    pub error: Option<MigrationError>,
    /// Ordered log transcript, appended by both the engine and the script
    pub logs: Vec<String>,
}

impl MigrationResult {
    pub fn new(migration: MigrationDescriptor) -> Self {
        Self {
            migration,
            status: MigrationStatus::Running,
            duration_seconds: 0.0,
            entities_created: 0,
            relationships_created: 0,
            version_records_created: 0,
            error: None,
            logs: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == MigrationStatus::Failed
    }
}

/// Everything that can go wrong around one migration run. Script-body
/// failures are contained per migration; none of these abort a batch.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration manifest not found: {}", path.display())]
    ManifestMissing { path: PathBuf },

    #[error("invalid migration manifest {} (line {line}, column {column}): {message}", path.display())]
    ManifestInvalid {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("no registered entry point for migration '{name}'")]
    EntryPointMissing { name: String },

    #[error("migration '{name}' is missing required metadata: {}", fields.join(", "))]
    MetadataMissing { name: String, fields: Vec<String> },

    #[error("uncommitted changes present in entity store: {details}")]
    StoreDirty { details: String },

    #[error("failed to verify entity store state: {0}")]
    StateCheck(anyhow::Error),

    #[error("migration script failed: {0:#}")]
    Script(anyhow::Error),

    #[error("failed to store migration log: {0:#}")]
    LedgerWrite(anyhow::Error),
}
