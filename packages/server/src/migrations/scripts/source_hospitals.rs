//! Migration: import health facilities from the Nepal Health Facility
//! Registry scrape as organization entities.
//!
//! Source: `source/hospitals.csv`. Rows with a free-text address go through
//! the scraping collaborator for structured extraction; extraction failures
//! keep the raw address rather than dropping the facility.

use anyhow::Result;
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

use crate::common::{text_to_slug, Author, EntitySubType, EntityType};
use crate::migrations::context::MigrationContext;
use crate::migrations::registry::MigrationScript;

const CHANGE_DESCRIPTION: &str = "Initial sourcing from NHFR";

const EXTRACTION_INSTRUCTIONS: &str = "Extract the Nepali address into its \
administrative parts. Use null for parts that are not present in the text.";

/// Structured address parts extracted from a free-text facility address
#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractedAddress {
    district: Option<String>,
    municipality: Option<String>,
    ward: Option<String>,
    tole: Option<String>,
}

pub struct SourceHospitals;

#[async_trait]
impl MigrationScript for SourceHospitals {
    fn name(&self) -> &'static str {
        "006-source-hospitals"
    }

    async fn run(&self, ctx: &MigrationContext) -> Result<()> {
        ctx.log("Migration started: Importing health facilities");

        let author = Author::new("Damodar Dahal");
        ctx.db.put_author(&author).await?;

        let rows = ctx.read_csv("source/hospitals.csv", None)?;
        ctx.log(format!("Loaded {} facilities from hospitals.csv", rows.len()));

        let existing: HashSet<String> = ctx
            .db
            .list_entities(
                100_000,
                Some(EntityType::Organization),
                Some(EntitySubType::Hospital),
            )
            .await?
            .into_iter()
            .map(|e| e.slug)
            .collect();

        let schema = serde_json::to_value(schema_for!(ExtractedAddress))?;

        let mut created = 0;
        for row in &rows {
            let Some(name) = row.get("name").filter(|s| !s.is_empty()) else {
                ctx.log("WARNING: Skipping facility row without a name");
                continue;
            };

            let slug = text_to_slug(name);
            if existing.contains(&slug) {
                ctx.log(format!("Facility already exists, skipping: {slug}"));
                continue;
            }

            let raw_address = row.get("address").cloned().unwrap_or_default();
            let address = if raw_address.is_empty() {
                json!(null)
            } else {
                match ctx
                    .scraping
                    .extract_structured_data(&raw_address, schema.clone(), EXTRACTION_INSTRUCTIONS)
                    .await
                {
                    Ok(parts) => json!({ "raw": raw_address, "parts": parts }),
                    Err(e) => {
                        ctx.log(format!(
                            "WARNING: Address extraction failed for {name}: {e}"
                        ));
                        json!({ "raw": raw_address })
                    }
                }
            };

            let entity_data = json!({
                "slug": slug,
                "names": [{
                    "kind": "PRIMARY",
                    "en": { "full": name },
                }],
                "facility_type": row.get("facility_type"),
                "ownership": row.get("ownership"),
                "address": address,
                "contacts": row.get("phone").filter(|s| !s.is_empty()).map(|phone| {
                    vec![json!({ "type": "PHONE", "value": phone })]
                }),
                "attribution": {
                    "source": "Nepal Health Facility Registry",
                    "details": "NHFR facility list scrape",
                },
            });

            let facility = ctx
                .publication
                .create_entity(
                    EntityType::Organization,
                    EntitySubType::Hospital,
                    entity_data,
                    author.id,
                    CHANGE_DESCRIPTION,
                )
                .await?;
            ctx.log(format!("Created facility {}", facility.id));
            created += 1;
        }

        ctx.log(format!("Created {created} health facilities"));
        ctx.log("Migration completed successfully");
        Ok(())
    }
}
