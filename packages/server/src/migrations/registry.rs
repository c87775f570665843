//! Compiled-in migration entry points.
//!
//! Each migration is a registered variant rather than a dynamically loaded
//! script: the registry maps a migration's full name to its entry point,
//! all conforming to one trait. Metadata lives in the folder's
//! `migration.json` declaration and is validated at load time.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::context::MigrationContext;
use super::scripts;

/// One migration's executable unit.
///
/// The async trait method is what makes an entry point suspend-capable:
/// a blocking body would be rejected at the type level, not at run time.
#[async_trait]
pub trait MigrationScript: Send + Sync + 'static {
    /// Full migration name, matching the folder, e.g. `"003-source-2082-political-parties"`
    fn name(&self) -> &'static str;

    /// Execute the migration against the provided context
    async fn run(&self, ctx: &MigrationContext) -> Result<()>;
}

/// Registry mapping full migration names to entry points
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: Vec<Arc<dyn MigrationScript>>,
}

impl ScriptRegistry {
    /// Empty registry (tests register their own scripts)
    pub fn new() -> Self {
        Self::default()
    }

    /// All migrations compiled into this binary.
    ///
    /// Add new migrations here.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(scripts::source_2082_political_parties::Source2082PoliticalParties);
        registry.register(scripts::seed_2079_election_candidates::Seed2079ElectionCandidates);
        registry.register(scripts::source_hospitals::SourceHospitals);
        registry
    }

    pub fn register<S: MigrationScript>(&mut self, script: S) {
        self.scripts.push(Arc::new(script));
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn MigrationScript>> {
        self.scripts.iter().find(|s| s.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scripts.iter().map(|s| s.name()).collect()
    }
}
