//! Best-effort entity lookup over the file store.
//!
//! Matches the query against entity slugs and serialized payloads. Good
//! enough for migrations resolving "which party entity is this name"; not
//! a ranking engine.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::common::{Entity, EntitySubType, EntityType};
use crate::kernel::traits::{BaseEntityDatabase, BaseSearchService};
use crate::store::FileEntityDatabase;

const SCAN_LIMIT: usize = 1_000_000;

pub struct FileSearchService {
    db: Arc<FileEntityDatabase>,
}

impl FileSearchService {
    pub fn new(db: Arc<FileEntityDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BaseSearchService for FileSearchService {
    async fn search_entities(
        &self,
        query: Option<&str>,
        entity_type: Option<EntityType>,
        sub_type: Option<EntitySubType>,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        let candidates = self
            .db
            .list_entities(SCAN_LIMIT, entity_type, sub_type)
            .await?;

        let mut matches: Vec<Entity> = match query {
            None => candidates,
            Some(q) => {
                let q = q.trim();
                candidates
                    .into_iter()
                    .filter(|e| e.slug.contains(q) || e.data.to_string().contains(q))
                    .collect()
            }
        };

        matches.truncate(limit);
        Ok(matches)
    }
}
