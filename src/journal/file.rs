//! JSON file journal
//!
//! Run summaries are kept in a single JSON file under the user's local
//! data directory. Writes go through a temp file and a rename so a crash
//! mid-write never truncates existing history.

use crate::journal::{Journal, RunSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Journal backed by a JSON file on disk
pub struct JsonJournal {
    path: PathBuf,
}

impl JsonJournal {
    /// Create a journal at an explicit path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create a journal at the default location
    /// (`<data dir>/provision/history.json`)
    pub async fn with_default_path() -> Result<Self> {
        let base = dirs::data_local_dir()
            .context("could not determine the local data directory")?
            .join("provision");
        tokio::fs::create_dir_all(&base)
            .await
            .with_context(|| format!("failed to create {}", base.display()))?;
        Ok(Self::new(base.join("history.json")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<RunSummary>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                serde_json::from_str(&content).context("run history file is corrupted")
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    async fn write_all(&self, runs: &[RunSummary]) -> Result<()> {
        let content = serde_json::to_string_pretty(runs)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!("Saved {} run(s) to {}", runs.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl Journal for JsonJournal {
    async fn save_run(&self, summary: &RunSummary) -> Result<()> {
        let mut runs = self.read_all().await?;
        runs.retain(|r| r.run_id != summary.run_id);
        runs.push(summary.clone());
        self.write_all(&runs).await
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.read_all().await?;
        Ok(runs.into_iter().find(|r| r.run_id == run_id))
    }

    async fn list_runs(&self, plan_name: &str) -> Result<Vec<RunSummary>> {
        let mut runs = self.read_all().await?;
        runs.retain(|r| r.plan_name == plan_name);
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    async fn list_plans(&self) -> Result<Vec<String>> {
        let runs = self.read_all().await?;
        let mut names: Vec<String> = runs.into_iter().map(|r| r.plan_name).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
