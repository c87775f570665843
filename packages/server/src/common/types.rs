//! Entity and relationship record types shared across the store and services.
//!
//! The entity payload itself is schemaless from the migration system's point
//! of view: scripts assemble a JSON document (names, contacts, identifiers,
//! attributions) and the store persists it verbatim. Only identity, typing
//! and timestamps are first-class here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySubType {
    Politician,
    PoliticalParty,
    Hospital,
    District,
    Municipality,
    Other,
}

impl EntitySubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Politician => "politician",
            Self::PoliticalParty => "political_party",
            Self::Hospital => "hospital",
            Self::District => "district",
            Self::Municipality => "municipality",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    CandidateOf,
    MemberOf,
    LocatedIn,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CandidateOf => "candidate_of",
            Self::MemberOf => "member_of",
            Self::LocatedIn => "located_in",
        }
    }
}

/// A persisted entity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub sub_type: EntitySubType,
    /// Stable human-readable identifier, unique within (type, sub_type)
    pub slug: String,
    /// Schemaless payload: names, contacts, identifiers, attributions, ...
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted relationship between two entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relationship_type: RelationshipType,
    pub created_at: DateTime<Utc>,
}

/// Author of a change, recorded in version records and migration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

impl Author {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: text_to_slug(name),
            name: name.to_string(),
        }
    }
}

/// Lowercase a display name into a kebab-case slug.
pub fn text_to_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_slug() {
        assert_eq!(text_to_slug("Nepali Congress"), "nepali-congress");
        assert_eq!(text_to_slug("  CPN (UML)  "), "cpn-uml");
        assert_eq!(text_to_slug("Damodar Dahal"), "damodar-dahal");
    }

    #[test]
    fn test_type_strings_match_serde() {
        let json = serde_json::to_string(&EntitySubType::PoliticalParty).unwrap();
        assert_eq!(json, "\"political_party\"");
        assert_eq!(EntitySubType::PoliticalParty.as_str(), "political_party");
    }
}
