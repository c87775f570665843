//! Migration loading: pair a descriptor with its registered entry point and
//! a strictly validated metadata declaration.
//!
//! Load-time failures (manifest missing or syntactically broken) are kept
//! distinct from contract failures (no registered entry point, incomplete
//! metadata) so a failed run reports the right phase.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::{MigrationDescriptor, MigrationError};
use super::registry::{MigrationScript, ScriptRegistry};

/// Primary and fallback declaration filenames; first found wins
pub const MANIFEST_FILE: &str = "migration.json";
pub const MANIFEST_FALLBACK_FILE: &str = "manifest.json";

/// The structured metadata declaration each migration folder carries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationManifest {
    pub author: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

/// A migration ready to execute: entry point plus validated metadata
pub struct ResolvedMigration {
    pub script: Arc<dyn MigrationScript>,
    pub manifest: MigrationManifest,
}

impl std::fmt::Debug for ResolvedMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedMigration")
            .field("script", &self.script.name())
            .field("manifest", &self.manifest)
            .finish()
    }
}

/// Locate the declaration file within a migration folder
pub fn find_manifest(folder: &Path) -> Option<PathBuf> {
    for name in [MANIFEST_FILE, MANIFEST_FALLBACK_FILE] {
        let candidate = folder.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Lenient read for discovery: any failure yields empty metadata with a
/// warning instead of an error.
pub fn read_manifest_lenient(path: &Path) -> MigrationManifest {
    match read_manifest(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!(manifest = %path.display(), error = %e, "Failed to read migration manifest");
            MigrationManifest::default()
        }
    }
}

fn read_manifest(path: &Path) -> Result<MigrationManifest, MigrationError> {
    let content = fs::read_to_string(path).map_err(|_| MigrationError::ManifestMissing {
        path: path.to_path_buf(),
    })?;

    serde_json::from_str(&content).map_err(|e| MigrationError::ManifestInvalid {
        path: path.to_path_buf(),
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })
}

/// Resolve a descriptor into an executable migration, or a descriptive
/// load-time failure. No side effects on failure.
pub fn load_migration(
    registry: &ScriptRegistry,
    migration: &MigrationDescriptor,
) -> Result<ResolvedMigration, MigrationError> {
    let full_name = migration.full_name();
    debug!(migration = %full_name, "Loading migration");

    let manifest = read_manifest(&migration.manifest_path)?;

    let script = registry
        .find(&full_name)
        .ok_or_else(|| MigrationError::EntryPointMissing {
            name: full_name.clone(),
        })?;

    // Report every missing field in one pass, not just the first
    let mut missing = Vec::new();
    if manifest.author.as_deref().map_or(true, str::is_empty) {
        missing.push("author".to_string());
    }
    if manifest.date.as_deref().map_or(true, str::is_empty) {
        missing.push("date".to_string());
    }
    if manifest.description.as_deref().map_or(true, str::is_empty) {
        missing.push("description".to_string());
    }
    if !missing.is_empty() {
        return Err(MigrationError::MetadataMissing {
            name: full_name,
            fields: missing,
        });
    }

    debug!(
        migration = %full_name,
        author = manifest.author.as_deref().unwrap_or(""),
        "Validated migration"
    );

    Ok(ResolvedMigration { script, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::context::MigrationContext;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    struct NoopScript;

    #[async_trait]
    impl MigrationScript for NoopScript {
        fn name(&self) -> &'static str {
            "000-noop"
        }

        async fn run(&self, _ctx: &MigrationContext) -> Result<()> {
            Ok(())
        }
    }

    fn descriptor(folder: &Path) -> MigrationDescriptor {
        MigrationDescriptor {
            ordinal: 0,
            slug: "noop".to_string(),
            folder_path: folder.to_path_buf(),
            manifest_path: folder.join(MANIFEST_FILE),
            author: None,
            date: None,
            description: None,
        }
    }

    fn registry() -> ScriptRegistry {
        let mut registry = ScriptRegistry::new();
        registry.register(NoopScript);
        registry
    }

    fn write_manifest(folder: &Path, content: &str) {
        fs::create_dir_all(folder).unwrap();
        fs::write(folder.join(MANIFEST_FILE), content).unwrap();
    }

    #[test]
    fn test_load_succeeds_with_complete_metadata() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-noop");
        write_manifest(
            &folder,
            r#"{"author": "A", "date": "2025-11-11", "description": "D"}"#,
        );

        let resolved = load_migration(&registry(), &descriptor(&folder)).unwrap();
        assert_eq!(resolved.script.name(), "000-noop");
        assert_eq!(resolved.manifest.author.as_deref(), Some("A"));
    }

    #[test]
    fn test_missing_manifest_is_a_load_error() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-noop");
        fs::create_dir_all(&folder).unwrap();

        let err = load_migration(&registry(), &descriptor(&folder)).unwrap_err();
        assert!(matches!(err, MigrationError::ManifestMissing { .. }));
    }

    #[test]
    fn test_syntax_error_reports_line_and_column() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-noop");
        write_manifest(&folder, "{\n  \"author\": ,\n}");

        let err = load_migration(&registry(), &descriptor(&folder)).unwrap_err();
        match err {
            MigrationError::ManifestInvalid { line, .. } => assert_eq!(line, 2),
            other => panic!("expected ManifestInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_unregistered_migration_is_a_contract_error() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-noop");
        write_manifest(
            &folder,
            r#"{"author": "A", "date": "2025-11-11", "description": "D"}"#,
        );

        let err = load_migration(&ScriptRegistry::new(), &descriptor(&folder)).unwrap_err();
        match err {
            MigrationError::EntryPointMissing { name } => assert_eq!(name, "000-noop"),
            other => panic!("expected EntryPointMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_each_single_missing_metadata_field_is_reported() {
        let cases = [
            (r#"{"date": "2025-11-11", "description": "D"}"#, "author"),
            (r#"{"author": "A", "description": "D"}"#, "date"),
            (r#"{"author": "A", "date": "2025-11-11"}"#, "description"),
        ];

        for (manifest, expected) in cases {
            let dir = tempdir().unwrap();
            let folder = dir.path().join("000-noop");
            write_manifest(&folder, manifest);

            let err = load_migration(&registry(), &descriptor(&folder)).unwrap_err();
            match err {
                MigrationError::MetadataMissing { fields, .. } => {
                    assert_eq!(fields, vec![expected.to_string()]);
                }
                other => panic!("expected MetadataMissing, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_all_missing_metadata_fields_reported_in_one_error() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-noop");
        write_manifest(&folder, "{}");

        let err = load_migration(&registry(), &descriptor(&folder)).unwrap_err();
        match err {
            MigrationError::MetadataMissing { fields, .. } => {
                assert_eq!(fields, vec!["author", "date", "description"]);
            }
            other => panic!("expected MetadataMissing, got {other:?}"),
        }
        // The rendered message lists every missing field
        let dir2 = tempdir().unwrap();
        let folder2 = dir2.path().join("000-noop");
        write_manifest(&folder2, "{}");
        let message = load_migration(&registry(), &descriptor(&folder2))
            .unwrap_err()
            .to_string();
        assert!(message.contains("author"));
        assert!(message.contains("date"));
        assert!(message.contains("description"));
    }

    #[test]
    fn test_empty_string_metadata_counts_as_missing() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-noop");
        write_manifest(
            &folder,
            r#"{"author": "", "date": "2025-11-11", "description": "D"}"#,
        );

        let err = load_migration(&registry(), &descriptor(&folder)).unwrap_err();
        match err {
            MigrationError::MetadataMissing { fields, .. } => {
                assert_eq!(fields, vec!["author"]);
            }
            other => panic!("expected MetadataMissing, got {other:?}"),
        }
    }
}
