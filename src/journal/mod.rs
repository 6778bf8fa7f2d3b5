//! Run journal
//!
//! Records finished runs so `provision history` can list them and so a
//! re-run against an already-provisioned image can warn about
//! non-idempotent steps.

pub mod file;

use crate::core::plan::Plan;
use crate::core::state::RunStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use file::JsonJournal;

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub plan_name: String,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
}

impl RunSummary {
    /// Progress fraction (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.completed_steps + self.failed_steps + self.skipped_steps) as f64
            / self.total_steps as f64
    }
}

/// Build a run summary from a plan's final state
pub fn create_summary(plan: &Plan) -> RunSummary {
    RunSummary {
        run_id: plan.state.run_id,
        plan_name: plan.name.clone(),
        status: plan.state.status,
        started_at: plan.state.started_at,
        completed_at: plan.state.completed_at,
        total_steps: plan.state.total_steps,
        completed_steps: plan.state.completed_steps,
        failed_steps: plan.state.failed_steps,
        skipped_steps: plan.state.skipped_steps,
    }
}

/// Storage for run summaries
#[async_trait]
pub trait Journal: Send + Sync {
    /// Record a finished run
    async fn save_run(&self, summary: &RunSummary) -> anyhow::Result<()>;

    /// Load a single run by ID
    async fn load_run(&self, run_id: Uuid) -> anyhow::Result<Option<RunSummary>>;

    /// List runs for a plan, most recent first
    async fn list_runs(&self, plan_name: &str) -> anyhow::Result<Vec<RunSummary>>;

    /// List all plan names with recorded runs
    async fn list_plans(&self) -> anyhow::Result<Vec<String>>;
}

/// In-memory journal for tests and `--no-history` runs
pub struct InMemoryJournal {
    runs: RwLock<HashMap<Uuid, RunSummary>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn save_run(&self, summary: &RunSummary) -> anyhow::Result<()> {
        self.runs
            .write()
            .await
            .insert(summary.run_id, summary.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> anyhow::Result<Option<RunSummary>> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }

    async fn list_runs(&self, plan_name: &str) -> anyhow::Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<RunSummary> = runs
            .values()
            .filter(|r| r.plan_name == plan_name)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(matching)
    }

    async fn list_plans(&self) -> anyhow::Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<String> = runs.values().map(|r| r.plan_name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
