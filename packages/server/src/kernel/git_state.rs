//! Git-backed state tracking for the entity store repository.
//!
//! The store lives in a git repository; "clean state" means `git status`
//! reports no uncommitted modifications, and the captured diff is whatever
//! `git diff HEAD` shows for the working tree.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::warn;

use super::traits::BaseStateTracker;

pub struct GitStateTracker {
    repo_path: PathBuf,
}

impl GitStateTracker {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .await
            .with_context(|| format!("failed to spawn git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git {} failed in {}: {}",
                args.join(" "),
                self.repo_path.display(),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl BaseStateTracker for GitStateTracker {
    async fn is_clean(&self) -> Result<bool> {
        let status = self.git(&["status", "--porcelain"]).await?;
        Ok(status.trim().is_empty())
    }

    async fn capture_diff(&self) -> Result<Option<String>> {
        // Untracked files (new entity records) don't show in `git diff`,
        // so stage everything into the index first.
        if let Err(e) = self.git(&["add", "-A"]).await {
            warn!(error = %e, "Failed to stage store changes for diff capture");
            return Ok(None);
        }

        match self.git(&["diff", "--cached"]).await {
            Ok(diff) if diff.trim().is_empty() => Ok(None),
            Ok(diff) => Ok(Some(diff)),
            Err(e) => {
                warn!(error = %e, "Diff capture failed, continuing without diff");
                Ok(None)
            }
        }
    }
}
