//! Built-in migrations, one module per catalog folder.
//!
//! Each module pairs with a folder under `migrations/` of the same full
//! name that carries the `migration.json` declaration and the source data
//! the script reads.

pub mod seed_2079_election_candidates;
pub mod source_2082_political_parties;
pub mod source_hospitals;
