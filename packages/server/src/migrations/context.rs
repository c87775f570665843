//! Execution context: the capability bundle handed to a migration's entry
//! point.
//!
//! One context per run, never shared across runs. It carries the service
//! collaborators, the migration's own folder for relative file reads, and
//! an ordered log buffer that the engine copies into the result afterwards.

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::kernel::traits::{
    BaseEntityDatabase, BasePublicationService, BaseScrapingService, BaseSearchService,
};

pub struct MigrationContext {
    pub publication: Arc<dyn BasePublicationService>,
    pub search: Arc<dyn BaseSearchService>,
    pub scraping: Arc<dyn BaseScrapingService>,
    pub db: Arc<dyn BaseEntityDatabase>,
    migration_dir: PathBuf,
    logs: Mutex<Vec<String>>,
}

impl MigrationContext {
    pub fn new(
        publication: Arc<dyn BasePublicationService>,
        search: Arc<dyn BaseSearchService>,
        scraping: Arc<dyn BaseScrapingService>,
        db: Arc<dyn BaseEntityDatabase>,
        migration_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            publication,
            search,
            scraping,
            db,
            migration_dir: migration_dir.into(),
            logs: Mutex::new(Vec::new()),
        }
    }

    /// The migration's own folder; relative reads resolve against it
    pub fn migration_dir(&self) -> &Path {
        &self.migration_dir
    }

    /// Append a line to the execution transcript (also emitted via tracing)
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(migration_dir = %self.migration_dir.display(), "{message}");
        self.logs.lock().unwrap().push(message);
    }

    /// Snapshot of the transcript so far, in append order
    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }

    /// Read and deserialize a JSON file relative to the migration folder
    pub fn read_json<T: DeserializeOwned>(&self, relative_path: &str) -> Result<T> {
        let path = self.migration_dir.join(relative_path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {relative_path}"))
    }

    /// Read a CSV file relative to the migration folder into header-keyed
    /// rows. `delimiter` defaults to a comma.
    pub fn read_csv(
        &self,
        relative_path: &str,
        delimiter: Option<u8>,
    ) -> Result<Vec<HashMap<String, String>>> {
        let path = self.migration_dir.join(relative_path);
        let file =
            File::open(&path).with_context(|| format!("failed to read {}", path.display()))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.unwrap_or(b','))
            .has_headers(true)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: HashMap<String, String> =
                record.with_context(|| format!("invalid CSV row in {relative_path}"))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{
        InMemoryEntityStore, MockPublicationService, MockScrapingService, MockSearchService,
    };
    use serde::Deserialize;
    use std::fs;
    use tempfile::tempdir;

    fn context(dir: &Path) -> MigrationContext {
        let store = InMemoryEntityStore::new();
        MigrationContext::new(
            Arc::new(MockPublicationService::new(store.clone())),
            Arc::new(MockSearchService::new(store.clone())),
            Arc::new(MockScrapingService::new()),
            store,
            dir,
        )
    }

    #[test]
    fn test_log_buffer_preserves_order() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.log("first");
        ctx.log("second");
        assert_eq!(ctx.logs(), vec!["first", "second"]);
    }

    #[test]
    fn test_read_json_relative_to_folder() {
        #[derive(Deserialize)]
        struct Doc {
            name: String,
        }

        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("source")).unwrap();
        fs::write(dir.path().join("source/doc.json"), r#"{"name": "nes"}"#).unwrap();

        let ctx = context(dir.path());
        let doc: Doc = ctx.read_json("source/doc.json").unwrap();
        assert_eq!(doc.name, "nes");
    }

    #[test]
    fn test_read_json_missing_file_names_the_path() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let err = ctx.read_json::<serde_json::Value>("missing.json").unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_read_csv_with_custom_delimiter() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("data.csv"),
            "name|district\nBir Hospital|Kathmandu\n",
        )
        .unwrap();

        let ctx = context(dir.path());
        let rows = ctx.read_csv("data.csv", Some(b'|')).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Bir Hospital");
        assert_eq!(rows[0]["district"], "Kathmandu");
    }
}
