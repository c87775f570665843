// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. Migration
// scripts receive them through the execution context; the engine itself
// only touches BaseEntityDatabase (counting) and BaseStateTracker
// (clean-state gate, diff capture).
//
// Naming convention: Base* for trait names (e.g., BasePublicationService)

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::common::{Author, Entity, EntitySubType, EntityType, Relationship, RelationshipType};

// =============================================================================
// Publication Service Trait (entity/relationship writes with provenance)
// =============================================================================

#[async_trait]
pub trait BasePublicationService: Send + Sync {
    /// Create a new entity and persist a version record for the change
    async fn create_entity(
        &self,
        entity_type: EntityType,
        sub_type: EntitySubType,
        entity_data: JsonValue,
        author_id: Uuid,
        change_description: &str,
    ) -> Result<Entity>;

    /// Update an existing entity, persisting a new version record
    async fn update_entity(&self, entity: Entity, change_description: &str) -> Result<Entity>;

    /// Create a relationship between two persisted entities
    async fn create_relationship(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        relationship_type: RelationshipType,
        author_id: Uuid,
        change_description: &str,
    ) -> Result<Relationship>;
}

// =============================================================================
// Search Service Trait (best-effort lookup)
// =============================================================================

#[async_trait]
pub trait BaseSearchService: Send + Sync {
    /// Search entities by free-text query with optional type filters.
    /// Ranking is best-effort; callers must tolerate fuzzy results.
    async fn search_entities(
        &self,
        query: Option<&str>,
        entity_type: Option<EntityType>,
        sub_type: Option<EntitySubType>,
        limit: usize,
    ) -> Result<Vec<Entity>>;
}

// =============================================================================
// Scraping Service Trait (LLM-backed translation / extraction)
// =============================================================================

#[async_trait]
pub trait BaseScrapingService: Send + Sync {
    /// Complete a prompt with an LLM (returns raw text response)
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String>;

    /// Extract structured data from free text according to a JSON schema
    async fn extract_structured_data(
        &self,
        text: &str,
        schema: JsonValue,
        instructions: &str,
    ) -> Result<JsonValue>;
}

// =============================================================================
// Entity Database Trait (direct read access to the store)
// =============================================================================

#[async_trait]
pub trait BaseEntityDatabase: Send + Sync {
    async fn list_entities(
        &self,
        limit: usize,
        entity_type: Option<EntityType>,
        sub_type: Option<EntitySubType>,
    ) -> Result<Vec<Entity>>;

    async fn list_relationships(&self, limit: usize) -> Result<Vec<Relationship>>;

    async fn put_author(&self, author: &Author) -> Result<()>;

    /// Count durable version records, recursively across the storage tree
    async fn count_version_records(&self) -> Result<u64>;
}

// =============================================================================
// State Tracker Trait (clean-state gate and diff capture)
// =============================================================================

#[async_trait]
pub trait BaseStateTracker: Send + Sync {
    /// True when the store has no uncommitted modifications relative to its
    /// last durable checkpoint
    async fn is_clean(&self) -> Result<bool>;

    /// Capture a diff of store changes since the last checkpoint.
    /// Returns None when the capability is unavailable or there is nothing
    /// to show; the engine must not change pass/fail semantics on absence.
    async fn capture_diff(&self) -> Result<Option<String>>;
}
