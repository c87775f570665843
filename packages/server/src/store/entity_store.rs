//! File-backed entity store.
//!
//! Layout under the store repository root:
//!
//! ```text
//! v2/
//!   entities/<entity_type>/<sub_type>/<id>.json
//!   relationships/<id>.json
//!   authors/<slug>.json
//!   versions/<entity_id>/<version_id>.json
//!   migration-logs/<migration>/...      (owned by the migration ledger)
//! ```
//!
//! Every record is a pretty-printed JSON document so store diffs stay
//! reviewable in git.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::common::{Author, Entity, EntitySubType, EntityType, Relationship};
use crate::kernel::traits::BaseEntityDatabase;

/// One durable version record, written alongside every entity change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub author_id: Uuid,
    pub change_description: String,
    pub created_at: DateTime<Utc>,
}

pub struct FileEntityDatabase {
    root: PathBuf,
}

impl FileEntityDatabase {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            root: repo_path.into(),
        }
    }

    /// Store repository root (the git working tree)
    pub fn repo_path(&self) -> &Path {
        &self.root
    }

    fn v2(&self) -> PathBuf {
        self.root.join("v2")
    }

    fn entities_dir(&self) -> PathBuf {
        self.v2().join("entities")
    }

    fn relationships_dir(&self) -> PathBuf {
        self.v2().join("relationships")
    }

    fn versions_dir(&self) -> PathBuf {
        self.v2().join("versions")
    }

    pub fn write_entity(&self, entity: &Entity) -> Result<()> {
        let dir = self
            .entities_dir()
            .join(entity.entity_type.as_str())
            .join(entity.sub_type.as_str());
        write_json(&dir.join(format!("{}.json", entity.id)), entity)
    }

    pub fn write_relationship(&self, relationship: &Relationship) -> Result<()> {
        let path = self
            .relationships_dir()
            .join(format!("{}.json", relationship.id));
        write_json(&path, relationship)
    }

    pub fn write_version(&self, version: &VersionRecord) -> Result<()> {
        let path = self
            .versions_dir()
            .join(version.entity_id.to_string())
            .join(format!("{}.json", version.id));
        write_json(&path, version)
    }

    fn read_entities_under(&self, dir: &Path, limit: usize, out: &mut Vec<Entity>) -> Result<()> {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if out.len() >= limit {
                return Ok(());
            }
            if entry.file_type().is_file()
                && entry.path().extension().map_or(false, |e| e == "json")
            {
                let entity = read_json(entry.path())?;
                out.push(entity);
            }
        }
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid record {}", path.display()))
}

#[async_trait]
impl BaseEntityDatabase for FileEntityDatabase {
    async fn list_entities(
        &self,
        limit: usize,
        entity_type: Option<EntityType>,
        sub_type: Option<EntitySubType>,
    ) -> Result<Vec<Entity>> {
        let dir = match (entity_type, sub_type) {
            (Some(t), Some(s)) => self.entities_dir().join(t.as_str()).join(s.as_str()),
            (Some(t), None) => self.entities_dir().join(t.as_str()),
            _ => self.entities_dir(),
        };

        let mut entities = Vec::new();
        if dir.exists() {
            self.read_entities_under(&dir, limit, &mut entities)?;
        }

        // A sub-type filter without an entity type has no dedicated folder
        if let (None, Some(s)) = (entity_type, sub_type) {
            entities.retain(|e| e.sub_type == s);
        }

        Ok(entities)
    }

    async fn list_relationships(&self, limit: usize) -> Result<Vec<Relationship>> {
        let dir = self.relationships_dir();
        let mut relationships = Vec::new();
        if !dir.exists() {
            return Ok(relationships);
        }
        for entry in fs::read_dir(&dir)? {
            if relationships.len() >= limit {
                break;
            }
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                relationships.push(read_json(&path)?);
            }
        }
        Ok(relationships)
    }

    async fn put_author(&self, author: &Author) -> Result<()> {
        let path = self.v2().join("authors").join(format!("{}.json", author.slug));
        write_json(&path, author)
    }

    async fn count_version_records(&self) -> Result<u64> {
        let dir = self.versions_dir();
        if !dir.exists() {
            return Ok(0);
        }
        let count = WalkDir::new(&dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn entity(sub_type: EntitySubType, slug: &str) -> Entity {
        let now = Utc::now();
        Entity {
            id: Uuid::new_v4(),
            entity_type: EntityType::Organization,
            sub_type,
            slug: slug.to_string(),
            data: json!({ "slug": slug }),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_round_trip_and_filters() {
        let dir = tempdir().unwrap();
        let db = FileEntityDatabase::new(dir.path());

        db.write_entity(&entity(EntitySubType::PoliticalParty, "nepali-congress"))
            .unwrap();
        db.write_entity(&entity(EntitySubType::Hospital, "bir-hospital"))
            .unwrap();

        let all = db.list_entities(100, None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let parties = db
            .list_entities(
                100,
                Some(EntityType::Organization),
                Some(EntitySubType::PoliticalParty),
            )
            .await
            .unwrap();
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].slug, "nepali-congress");

        let people = db
            .list_entities(100, Some(EntityType::Person), None)
            .await
            .unwrap();
        assert!(people.is_empty());
    }

    #[tokio::test]
    async fn test_version_record_count_is_recursive() {
        let dir = tempdir().unwrap();
        let db = FileEntityDatabase::new(dir.path());
        assert_eq!(db.count_version_records().await.unwrap(), 0);

        let entity_id = Uuid::new_v4();
        for _ in 0..3 {
            db.write_version(&VersionRecord {
                id: Uuid::new_v4(),
                entity_id,
                author_id: Uuid::new_v4(),
                change_description: "Initial sourcing".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        }

        assert_eq!(db.count_version_records().await.unwrap(), 3);
    }
}
