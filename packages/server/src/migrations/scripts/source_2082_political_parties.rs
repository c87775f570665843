//! Migration: import registered political parties from the Election
//! Commission of Nepal (2082 registration list).
//!
//! Sources, relative to the migration folder:
//! - `source/parties-data-en.json` — LLM-translated fields keyed by the
//!   party's Nepali name
//! - `source/parties-2082.csv` — the raw pipe-delimited commission export

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};

use crate::common::{text_to_slug, Author, EntitySubType, EntityType};
use crate::migrations::context::MigrationContext;
use crate::migrations::registry::MigrationScript;

const CHANGE_DESCRIPTION: &str = "Initial sourcing";

/// Translated party fields produced ahead of time by the translation service
#[derive(Debug, Deserialize)]
struct TranslatedParty {
    name: String,
    address: Option<String>,
    main_person: Option<String>,
    symbol_name: Option<String>,
    #[serde(default)]
    contact: Vec<String>,
}

pub struct Source2082PoliticalParties;

#[async_trait]
impl MigrationScript for Source2082PoliticalParties {
    fn name(&self) -> &'static str {
        "003-source-2082-political-parties"
    }

    async fn run(&self, ctx: &MigrationContext) -> Result<()> {
        ctx.log("Migration started: Importing political parties");

        let author = Author::new("Damodar Dahal");
        ctx.db.put_author(&author).await?;
        ctx.log(format!("Created author: {} ({})", author.name, author.id));

        // Keyed by Nepali party name; BTreeMap keeps replays deterministic
        let party_data: BTreeMap<String, TranslatedParty> =
            ctx.read_json("source/parties-data-en.json")?;
        ctx.log(format!(
            "Loaded {} parties from parties-data-en.json",
            party_data.len()
        ));

        let raw_data = ctx.read_csv("source/parties-2082.csv", Some(b'|'))?;
        let raw_lookup: BTreeMap<&str, &std::collections::HashMap<String, String>> = raw_data
            .iter()
            .filter_map(|row| row.get("दलको नाम").map(|name| (name.as_str(), row)))
            .collect();

        // Row-level idempotence: skip parties already in the store
        let existing: HashSet<String> = ctx
            .db
            .list_entities(
                10_000,
                Some(EntityType::Organization),
                Some(EntitySubType::PoliticalParty),
            )
            .await?
            .into_iter()
            .map(|e| e.slug)
            .collect();

        let mut count = 0;
        for (name_ne, translated) in &party_data {
            let Some(raw_row) = raw_lookup.get(name_ne.as_str()) else {
                ctx.log(format!("WARNING: No raw data for {name_ne}"));
                continue;
            };

            let slug = text_to_slug(&translated.name);
            if existing.contains(&slug) {
                ctx.log(format!("Party already exists, skipping: {slug}"));
                continue;
            }

            let entity_data = json!({
                "slug": slug,
                "names": [{
                    "kind": "PRIMARY",
                    "en": { "full": translated.name },
                    "ne": { "full": name_ne },
                }],
                "registration_number": raw_row.get("दर्ता नं."),
                "registration_date_bs": raw_row.get("दल दर्ता मिति"),
                "address": translated.address,
                "party_chief": translated.main_person.as_ref().map(|en| json!({
                    "en": en,
                    "ne": raw_row.get("प्रमुख पदाधिकारीको नाम"),
                })),
                "symbol": translated.symbol_name,
                "contacts": translated.contact,
                "attribution": {
                    "source": "Nepal Election Commission",
                    "details": "Registered Parties (2082)",
                },
            });

            let party = ctx
                .publication
                .create_entity(
                    EntityType::Organization,
                    EntitySubType::PoliticalParty,
                    entity_data,
                    author.id,
                    CHANGE_DESCRIPTION,
                )
                .await?;
            ctx.log(format!("Created party {}", party.id));
            count += 1;
        }

        ctx.log(format!("Created {count} political parties"));

        let entities = ctx
            .db
            .list_entities(
                1000,
                Some(EntityType::Organization),
                Some(EntitySubType::PoliticalParty),
            )
            .await?;
        ctx.log(format!(
            "Verified: {} political_party entities in store",
            entities.len()
        ));

        ctx.log("Migration completed successfully");
        Ok(())
    }
}
