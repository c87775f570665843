//! Migration discovery: scan the migrations root and build the catalog.
//!
//! Discovery is side-effect free and deliberately forgiving: a folder with
//! a bad name, a missing manifest, or an unparseable date is skipped (or
//! cataloged with absent metadata) with a warning rather than failing the
//! whole scan. Execution applies the strict checks later.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::loader::{find_manifest, read_manifest_lenient};
use super::models::MigrationDescriptor;

lazy_static! {
    static ref FOLDER_NAME: Regex = Regex::new(r"^(\d{3})-([a-z0-9-]+)$").unwrap();
}

/// Scan `migrations_dir` and return the ordered catalog.
///
/// An absent root is "no migrations defined yet", not an error. Results are
/// sorted ascending by ordinal; ties keep directory-listing order.
pub fn discover_migrations(migrations_dir: &Path) -> Vec<MigrationDescriptor> {
    info!(dir = %migrations_dir.display(), "Discovering migrations");

    if !migrations_dir.exists() {
        warn!(
            dir = %migrations_dir.display(),
            "Migrations directory does not exist"
        );
        return Vec::new();
    }

    let entries = match fs::read_dir(migrations_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %migrations_dir.display(), error = %e, "Failed to read migrations directory");
            return Vec::new();
        }
    };

    let mut migrations = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let folder_path = entry.path();
        if !folder_path.is_dir() {
            continue;
        }

        let folder_name = entry.file_name().to_string_lossy().into_owned();

        // Skip hidden directories and build-artifact caches
        if folder_name.starts_with('.') || folder_name == "target" {
            continue;
        }

        let Some(captures) = FOLDER_NAME.captures(&folder_name) else {
            warn!(
                folder = %folder_name,
                "Skipping migration folder: name must match NNN-kebab-case-slug"
            );
            continue;
        };

        let ordinal: u32 = captures[1].parse().expect("regex guarantees digits");
        let slug = captures[2].to_string();

        let Some(manifest_path) = find_manifest(&folder_path) else {
            warn!(
                folder = %folder_name,
                "Skipping migration folder: no migration.json or manifest.json found"
            );
            continue;
        };

        let manifest = read_manifest_lenient(&manifest_path);

        let date = manifest.date.as_deref().and_then(|raw| {
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    warn!(
                        folder = %folder_name,
                        date = %raw,
                        "Invalid date format in manifest, expected YYYY-MM-DD"
                    );
                    None
                }
            }
        });

        let descriptor = MigrationDescriptor {
            ordinal,
            slug,
            folder_path,
            manifest_path,
            author: manifest.author,
            date,
            description: manifest.description,
        };

        debug!(migration = %descriptor.full_name(), "Discovered migration");
        migrations.push(descriptor);
    }

    migrations.sort_by_key(|m| m.ordinal);

    info!(count = migrations.len(), "Discovered migrations");
    migrations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_migration(root: &Path, folder: &str, manifest: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("migration.json"), manifest).unwrap();
    }

    const VALID_MANIFEST: &str = r#"{
        "author": "Damodar Dahal",
        "date": "2025-11-11",
        "description": "Test migration"
    }"#;

    #[test]
    fn test_missing_root_yields_empty_catalog() {
        let dir = tempdir().unwrap();
        let catalog = discover_migrations(&dir.path().join("does-not-exist"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_ordering_is_by_ordinal() {
        let dir = tempdir().unwrap();
        // Created out of order on purpose
        write_migration(dir.path(), "002-c", VALID_MANIFEST);
        write_migration(dir.path(), "000-a", VALID_MANIFEST);
        write_migration(dir.path(), "001-b", VALID_MANIFEST);

        let catalog = discover_migrations(dir.path());
        let names: Vec<String> = catalog.iter().map(|m| m.full_name()).collect();
        assert_eq!(names, vec!["000-a", "001-b", "002-c"]);
    }

    #[test]
    fn test_invalid_folder_names_are_skipped() {
        let dir = tempdir().unwrap();
        write_migration(dir.path(), "000-valid", VALID_MANIFEST);
        write_migration(dir.path(), "1-too-short", VALID_MANIFEST);
        write_migration(dir.path(), "002_underscores", VALID_MANIFEST);
        write_migration(dir.path(), "003-UpperCase", VALID_MANIFEST);
        write_migration(dir.path(), ".hidden", VALID_MANIFEST);
        write_migration(dir.path(), "target", VALID_MANIFEST);

        let catalog = discover_migrations(dir.path());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].full_name(), "000-valid");
    }

    #[test]
    fn test_folder_without_manifest_is_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("000-no-manifest")).unwrap();
        write_migration(dir.path(), "001-ok", VALID_MANIFEST);

        let catalog = discover_migrations(dir.path());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].full_name(), "001-ok");
    }

    #[test]
    fn test_fallback_manifest_name_is_accepted() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("000-fallback");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("manifest.json"), VALID_MANIFEST).unwrap();

        let catalog = discover_migrations(dir.path());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].author.as_deref(), Some("Damodar Dahal"));
    }

    #[test]
    fn test_bad_date_is_recorded_as_absent() {
        let dir = tempdir().unwrap();
        write_migration(
            dir.path(),
            "000-bad-date",
            r#"{"author": "A", "date": "11/11/2025", "description": "D"}"#,
        );

        let catalog = discover_migrations(dir.path());
        assert_eq!(catalog.len(), 1);
        assert!(catalog[0].date.is_none());
        assert_eq!(catalog[0].author.as_deref(), Some("A"));
    }

    #[test]
    fn test_unparseable_manifest_catalogs_with_absent_metadata() {
        let dir = tempdir().unwrap();
        write_migration(dir.path(), "000-broken", "{ not json");

        let catalog = discover_migrations(dir.path());
        assert_eq!(catalog.len(), 1);
        assert!(catalog[0].author.is_none());
        assert!(catalog[0].date.is_none());
        assert!(catalog[0].description.is_none());
    }
}
