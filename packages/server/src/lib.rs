//! Core library for the Nepal Entity Store (NES).
//!
//! The store is a versioned, file-backed knowledge base of civic entities
//! (persons, organizations, locations) populated by replayable data
//! migrations. The interesting machinery lives in [`migrations`]: discovery
//! of versioned migration folders, an applied-migration ledger, and an
//! execution engine with idempotence and clean-state guarantees.

pub mod common;
pub mod config;
pub mod kernel;
pub mod migrations;
pub mod services;
pub mod store;
