//! The run loop: preflight checks, then every group in order.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::auth::TokenCache;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::pipeline::group::{GroupAggregator, GroupOutcome};
use crate::provision::DirectoryProvisioner;
use crate::reporter::ErrorReporter;
use crate::table::GroupTable;
use crate::types::Group;

/// Totals for a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Groups that ran, in input order
    pub groups: Vec<GroupOutcome>,

    /// Failures reported during the run, preflight included
    pub error_count: u64,

    pub elapsed: Duration,

    /// Why the run stopped early, if it did
    pub aborted: Option<String>,

    /// Groups never started because the run stopped early
    pub skipped: Vec<String>,
}

impl RunSummary {
    /// Elapsed wall-clock time in whole minutes, truncated.
    pub fn elapsed_minutes(&self) -> u64 {
        self.elapsed.as_secs() / 60
    }

    pub fn rows(&self) -> usize {
        self.groups.iter().map(|g| g.output.len()).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.groups.iter().map(|g| g.succeeded).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Audio generation completed with {} errors in {} minutes.",
            self.error_count,
            self.elapsed_minutes()
        )
    }
}

pub struct Orchestrator {
    config: Arc<Config>,
    aggregator: GroupAggregator,
    provisioner: DirectoryProvisioner,
    tokens: Arc<TokenCache>,
    reporter: ErrorReporter,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        aggregator: GroupAggregator,
        tokens: Arc<TokenCache>,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            config,
            aggregator,
            provisioner: DirectoryProvisioner::new(reporter.clone()),
            tokens,
            reporter,
        }
    }

    /// Check everything that must hold before any row is touched: required
    /// columns in every table, a folder for every group and a usable access
    /// token.
    ///
    /// All problems are collected into one reported
    /// [`PipelineError::Config`].
    pub async fn preflight(&self, tables: Vec<GroupTable>) -> Result<Vec<Group>> {
        let mut problems = Vec::new();
        let mut groups = Vec::with_capacity(tables.len());

        for table in tables {
            match table.rows(&self.config.columns) {
                Ok(rows) => groups.push(Group {
                    name: table.name.clone(),
                    table,
                    rows,
                }),
                Err(err) => problems.push(err.to_string()),
            }
        }

        let missing = self
            .config
            .missing_folders(groups.iter().map(|g| g.name.as_str()));
        if !missing.is_empty() {
            problems.push(format!("no folder configured for group(s): {}", missing.join(", ")));
        }

        if let Err(err) = self.tokens.current().await {
            problems.push(format!("remote store credentials unusable: {}", err));
        }

        if problems.is_empty() {
            info!(groups = groups.len(), "Preflight passed");
            return Ok(groups);
        }

        let err = PipelineError::Config(problems.join("; "));
        self.reporter.report(&err, "preflight");
        self.reporter.flush();
        Err(err)
    }

    /// Run every group in order.
    ///
    /// Only a preflight failure is returned as an error. Authentication
    /// expiry stops the run after the current group's table is persisted and
    /// is recorded in the summary.
    pub async fn run(&self, tables: Vec<GroupTable>) -> Result<RunSummary> {
        let started = Instant::now();
        let groups = self.preflight(tables).await?;

        let run_root = self.provisioner.ensure_path(&self.config.paths.run_root);
        let mut outcomes = Vec::with_capacity(groups.len());
        let mut skipped = Vec::new();
        let mut aborted: Option<String> = None;

        for group in &groups {
            if aborted.is_some() {
                skipped.push(group.name.clone());
                continue;
            }

            let folder_id = self.config.folder_for(&group.name).ok_or_else(|| {
                PipelineError::Config(format!("no folder configured for group {}", group.name))
            })?;
            let group_dir = self.provisioner.ensure(&run_root, &group.name);

            let outcome = self.aggregator.run(group, &group_dir, folder_id).await;
            aborted = outcome.aborted.clone();
            outcomes.push(outcome);
        }

        if !skipped.is_empty() {
            warn!(skipped = %skipped.join(", "), "Groups skipped after authentication expired");
        }
        self.reporter.flush();

        let summary = RunSummary {
            groups: outcomes,
            error_count: self.reporter.count(),
            elapsed: started.elapsed(),
            aborted,
            skipped,
        };
        info!(
            groups = summary.groups.len(),
            rows = summary.rows(),
            succeeded = summary.succeeded(),
            errors = summary.error_count,
            "Run finished"
        );
        Ok(summary)
    }
}
