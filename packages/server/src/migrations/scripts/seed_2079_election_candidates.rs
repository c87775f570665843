//! Migration: import 2079 election candidates as person entities, linking
//! each to their party with a candidacy relationship.
//!
//! Source: `source/candidates-2079.csv` (comma-delimited election results
//! export with bilingual names). Party resolution goes through the search
//! collaborator because the commission's party spellings drift from the
//! registered names; a small correction map patches the known offenders.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};

use crate::common::{text_to_slug, Author, EntitySubType, EntityType, RelationshipType};
use crate::migrations::context::MigrationContext;
use crate::migrations::registry::MigrationScript;

const CHANGE_DESCRIPTION: &str = "Initial sourcing from 2079 election results";

/// Commission spelling -> registered party name (Nepali)
fn party_name_corrections() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("नेपाली काँग्रेस", "नेपाली कांग्रेस"),
        (
            "नेपाल कम्युनिष्ट पार्टी (एमाले)",
            "नेपाल कम्युनिष्ट पार्टी (एकीकृत मार्क्सवादी लेनिनवादी)",
        ),
        (
            "तराइ-मधेश लोकतान्त्रिक पार्टी",
            "तराई-मधेश लोकतान्त्रिक पार्टी",
        ),
    ])
}

pub struct Seed2079ElectionCandidates;

#[async_trait]
impl MigrationScript for Seed2079ElectionCandidates {
    fn name(&self) -> &'static str {
        "005-seed-2079-election-candidates"
    }

    async fn run(&self, ctx: &MigrationContext) -> Result<()> {
        ctx.log("Migration started: Importing 2079 election candidates");

        let author = Author::new("Damodar Dahal");
        ctx.db.put_author(&author).await?;

        let rows = ctx.read_csv("source/candidates-2079.csv", None)?;
        ctx.log(format!("Loaded {} candidates from candidates-2079.csv", rows.len()));

        let corrections = party_name_corrections();

        let existing: HashSet<String> = ctx
            .db
            .list_entities(
                100_000,
                Some(EntityType::Person),
                Some(EntitySubType::Politician),
            )
            .await?
            .into_iter()
            .map(|e| e.slug)
            .collect();

        let mut created = 0;
        let mut linked = 0;
        for row in &rows {
            let Some(name_en) = row.get("name_en").filter(|s| !s.is_empty()) else {
                ctx.log("WARNING: Skipping row without an English name");
                continue;
            };
            let name_ne = row.get("name_ne").cloned().unwrap_or_default();
            let district = row.get("district").cloned().unwrap_or_default();

            let slug = text_to_slug(name_en);
            if existing.contains(&slug) {
                ctx.log(format!("Candidate already exists, skipping: {slug}"));
                continue;
            }

            let entity_data = json!({
                "slug": slug,
                "names": [{
                    "kind": "PRIMARY",
                    "en": { "full": name_en },
                    "ne": { "full": name_ne },
                }],
                "gender": row.get("gender"),
                "electoral_details": {
                    "election": "2079 House of Representatives",
                    "district": district,
                    "constituency": row.get("constituency"),
                },
                "attribution": {
                    "source": "Nepal Election Commission",
                    "details": "2079 election results",
                },
            });

            let person = ctx
                .publication
                .create_entity(
                    EntityType::Person,
                    EntitySubType::Politician,
                    entity_data,
                    author.id,
                    CHANGE_DESCRIPTION,
                )
                .await?;
            created += 1;

            // Resolve the candidate's party and record the candidacy
            let Some(party_raw) = row.get("party_ne").filter(|s| !s.is_empty()) else {
                ctx.log(format!("No party listed for {name_en} (independent)"));
                continue;
            };
            let party_name = corrections
                .get(party_raw.as_str())
                .copied()
                .unwrap_or(party_raw.as_str());

            let matches = ctx
                .search
                .search_entities(
                    Some(party_name),
                    Some(EntityType::Organization),
                    Some(EntitySubType::PoliticalParty),
                    1,
                )
                .await?;

            match matches.first() {
                Some(party) => {
                    ctx.publication
                        .create_relationship(
                            person.id,
                            party.id,
                            RelationshipType::CandidateOf,
                            author.id,
                            CHANGE_DESCRIPTION,
                        )
                        .await?;
                    linked += 1;
                }
                None => {
                    ctx.log(format!(
                        "WARNING: No party entity found for '{party_name}' ({name_en})"
                    ));
                }
            }
        }

        ctx.log(format!(
            "Created {created} candidates, {linked} candidacy relationships"
        ));
        ctx.log("Migration completed successfully");
        Ok(())
    }
}
