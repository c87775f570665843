use anyhow::Result;
use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the migrations catalog (folders named `NNN-slug`)
    pub migrations_dir: PathBuf,
    /// Root of the entity store repository (git-tracked)
    pub db_repo_path: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            migrations_dir: env::var("NES_MIGRATIONS_DIR")
                .unwrap_or_else(|_| "migrations".to_string())
                .into(),
            db_repo_path: env::var("NES_DB_PATH")
                .unwrap_or_else(|_| "nes-db".to_string())
                .into(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        })
    }
}
