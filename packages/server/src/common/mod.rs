pub mod types;

pub use types::{
    text_to_slug, Author, Entity, EntitySubType, EntityType, Relationship, RelationshipType,
};
