//! Publication service: the only write path into the entity store.
//!
//! Every create/update goes through here so that each change leaves a
//! version record with author and change description behind it.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::common::{Entity, EntitySubType, EntityType, Relationship, RelationshipType};
use crate::kernel::traits::BasePublicationService;
use crate::store::entity_store::{FileEntityDatabase, VersionRecord};

pub struct PublicationService {
    db: Arc<FileEntityDatabase>,
}

impl PublicationService {
    pub fn new(db: Arc<FileEntityDatabase>) -> Self {
        Self { db }
    }

    fn record_version(
        &self,
        entity_id: Uuid,
        author_id: Uuid,
        change_description: &str,
    ) -> Result<()> {
        self.db.write_version(&VersionRecord {
            id: Uuid::new_v4(),
            entity_id,
            author_id,
            change_description: change_description.to_string(),
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl BasePublicationService for PublicationService {
    async fn create_entity(
        &self,
        entity_type: EntityType,
        sub_type: EntitySubType,
        entity_data: JsonValue,
        author_id: Uuid,
        change_description: &str,
    ) -> Result<Entity> {
        let slug = match entity_data.get("slug").and_then(|s| s.as_str()) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => bail!("entity data must carry a non-empty 'slug'"),
        };

        let now = Utc::now();
        let entity = Entity {
            id: Uuid::new_v4(),
            entity_type,
            sub_type,
            slug,
            data: entity_data,
            created_at: now,
            updated_at: now,
        };

        self.db.write_entity(&entity)?;
        self.record_version(entity.id, author_id, change_description)?;

        debug!(
            entity_id = %entity.id,
            slug = %entity.slug,
            entity_type = entity_type.as_str(),
            "Created entity"
        );
        Ok(entity)
    }

    async fn update_entity(&self, mut entity: Entity, change_description: &str) -> Result<Entity> {
        entity.updated_at = Utc::now();
        self.db.write_entity(&entity)?;
        // Updates re-use the author baked into the previous version chain;
        // migrations that need a distinct author create a new entity instead.
        self.record_version(entity.id, Uuid::nil(), change_description)?;
        Ok(entity)
    }

    async fn create_relationship(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        relationship_type: RelationshipType,
        author_id: Uuid,
        change_description: &str,
    ) -> Result<Relationship> {
        let relationship = Relationship {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            relationship_type,
            created_at: Utc::now(),
        };

        self.db.write_relationship(&relationship)?;
        self.record_version(source_id, author_id, change_description)?;

        debug!(
            relationship_id = %relationship.id,
            relationship_type = relationship_type.as_str(),
            "Created relationship"
        );
        Ok(relationship)
    }
}
