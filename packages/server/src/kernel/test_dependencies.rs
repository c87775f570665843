// Mock implementations for testing
//
// Provides in-memory collaborators that can be injected into the migration
// runner for tests. The publication, search and database mocks share one
// InMemoryEntityStore so created entities are visible to counting and
// lookup in the same run.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::common::{Author, Entity, EntitySubType, EntityType, Relationship, RelationshipType};

use super::traits::{
    BaseEntityDatabase, BasePublicationService, BaseScrapingService, BaseSearchService,
    BaseStateTracker,
};

// =============================================================================
// Shared In-Memory Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryEntityStore {
    entities: Mutex<Vec<Entity>>,
    relationships: Mutex<Vec<Relationship>>,
    authors: Mutex<Vec<Author>>,
    version_records: Mutex<u64>,
    /// When set, every database call fails (for degraded-count tests)
    pub fail_reads: AtomicBool,
}

impl InMemoryEntityStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.entities.lock().unwrap().clone()
    }

    pub fn relationships(&self) -> Vec<Relationship> {
        self.relationships.lock().unwrap().clone()
    }

    pub fn authors(&self) -> Vec<Author> {
        self.authors.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseEntityDatabase for InMemoryEntityStore {
    async fn list_entities(
        &self,
        limit: usize,
        entity_type: Option<EntityType>,
        sub_type: Option<EntitySubType>,
    ) -> Result<Vec<Entity>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated database outage");
        }
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .filter(|e| sub_type.map_or(true, |s| e.sub_type == s))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_relationships(&self, limit: usize) -> Result<Vec<Relationship>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated database outage");
        }
        Ok(self
            .relationships
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn put_author(&self, author: &Author) -> Result<()> {
        self.authors.lock().unwrap().push(author.clone());
        Ok(())
    }

    async fn count_version_records(&self) -> Result<u64> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated database outage");
        }
        Ok(*self.version_records.lock().unwrap())
    }
}

// =============================================================================
// Mock Publication Service
// =============================================================================

pub struct MockPublicationService {
    store: Arc<InMemoryEntityStore>,
}

impl MockPublicationService {
    pub fn new(store: Arc<InMemoryEntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BasePublicationService for MockPublicationService {
    async fn create_entity(
        &self,
        entity_type: EntityType,
        sub_type: EntitySubType,
        entity_data: JsonValue,
        _author_id: Uuid,
        _change_description: &str,
    ) -> Result<Entity> {
        let now = Utc::now();
        let slug = entity_data
            .get("slug")
            .and_then(|s| s.as_str())
            .unwrap_or("")
            .to_string();
        let entity = Entity {
            id: Uuid::new_v4(),
            entity_type,
            sub_type,
            slug,
            data: entity_data,
            created_at: now,
            updated_at: now,
        };
        self.store.entities.lock().unwrap().push(entity.clone());
        *self.store.version_records.lock().unwrap() += 1;
        Ok(entity)
    }

    async fn update_entity(&self, entity: Entity, _change_description: &str) -> Result<Entity> {
        let mut entities = self.store.entities.lock().unwrap();
        if let Some(existing) = entities.iter_mut().find(|e| e.id == entity.id) {
            *existing = entity.clone();
        }
        *self.store.version_records.lock().unwrap() += 1;
        Ok(entity)
    }

    async fn create_relationship(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        relationship_type: RelationshipType,
        _author_id: Uuid,
        _change_description: &str,
    ) -> Result<Relationship> {
        let relationship = Relationship {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            relationship_type,
            created_at: Utc::now(),
        };
        self.store
            .relationships
            .lock()
            .unwrap()
            .push(relationship.clone());
        Ok(relationship)
    }
}

// =============================================================================
// Mock Search Service
// =============================================================================

pub struct MockSearchService {
    store: Arc<InMemoryEntityStore>,
}

impl MockSearchService {
    pub fn new(store: Arc<InMemoryEntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseSearchService for MockSearchService {
    async fn search_entities(
        &self,
        query: Option<&str>,
        entity_type: Option<EntityType>,
        sub_type: Option<EntitySubType>,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        Ok(self
            .store
            .entities
            .lock()
            .unwrap()
            .iter()
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .filter(|e| sub_type.map_or(true, |s| e.sub_type == s))
            .filter(|e| {
                query.map_or(true, |q| {
                    e.slug.contains(q) || e.data.to_string().contains(q)
                })
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Mock Scraping Service
// =============================================================================

pub struct MockScrapingService {
    text_responses: Mutex<Vec<String>>,
    structured_responses: Mutex<Vec<JsonValue>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockScrapingService {
    pub fn new() -> Self {
        Self {
            text_responses: Mutex::new(Vec::new()),
            structured_responses: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text_response(self, text: &str) -> Self {
        self.text_responses.lock().unwrap().push(text.to_string());
        self
    }

    pub fn with_structured_response(self, value: JsonValue) -> Self {
        self.structured_responses.lock().unwrap().push(value);
        self
    }
}

impl Default for MockScrapingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseScrapingService for MockScrapingService {
    async fn generate_text(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _temperature: Option<f32>,
    ) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.text_responses.lock().unwrap();
        if responses.is_empty() {
            bail!("MockScrapingService has no queued text responses");
        }
        Ok(responses.remove(0))
    }

    async fn extract_structured_data(
        &self,
        text: &str,
        _schema: JsonValue,
        _instructions: &str,
    ) -> Result<JsonValue> {
        self.prompts.lock().unwrap().push(text.to_string());
        let mut responses = self.structured_responses.lock().unwrap();
        if responses.is_empty() {
            bail!("MockScrapingService has no queued structured responses");
        }
        Ok(responses.remove(0))
    }
}

// =============================================================================
// Mock State Tracker
// =============================================================================

pub struct MockStateTracker {
    clean: AtomicBool,
    /// When set, `is_clean` errors instead of answering
    state_check_fails: AtomicBool,
    diff: Mutex<Option<String>>,
    /// When set, `capture_diff` errors instead of answering
    diff_fails: AtomicBool,
}

impl MockStateTracker {
    pub fn clean() -> Self {
        Self {
            clean: AtomicBool::new(true),
            state_check_fails: AtomicBool::new(false),
            diff: Mutex::new(None),
            diff_fails: AtomicBool::new(false),
        }
    }

    pub fn dirty() -> Self {
        let tracker = Self::clean();
        tracker.clean.store(false, Ordering::SeqCst);
        tracker
    }

    /// A tracker that cannot determine cleanliness at all (e.g. no git)
    pub fn unverifiable() -> Self {
        let tracker = Self::clean();
        tracker.state_check_fails.store(true, Ordering::SeqCst);
        tracker
    }

    pub fn with_diff(self, diff: &str) -> Self {
        *self.diff.lock().unwrap() = Some(diff.to_string());
        self
    }

    pub fn with_failing_diff(self) -> Self {
        self.diff_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_clean(&self, clean: bool) {
        self.clean.store(clean, Ordering::SeqCst);
    }
}

#[async_trait]
impl BaseStateTracker for MockStateTracker {
    async fn is_clean(&self) -> Result<bool> {
        if self.state_check_fails.load(Ordering::SeqCst) {
            bail!("simulated state tracker outage");
        }
        Ok(self.clean.load(Ordering::SeqCst))
    }

    async fn capture_diff(&self) -> Result<Option<String>> {
        if self.diff_fails.load(Ordering::SeqCst) {
            bail!("simulated diff capture failure");
        }
        Ok(self.diff.lock().unwrap().clone())
    }
}
