//! Per-group aggregation: every row of a group, in order, into one
//! augmented output table.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::row::RowPipeline;
use crate::reporter::ErrorReporter;
use crate::table::{output_path, GroupTable};
use crate::types::{Group, Row, RowOutcome};

/// Reason recorded for rows never attempted after authentication expired.
pub const SKIPPED_AFTER_AUTH_EXPIRY: &str = "not attempted: authentication expired";

/// Result of running one group.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub name: String,

    /// Input table plus the link column; same rows in the same order
    pub output: GroupTable,

    /// Where `output` was written; `None` if persisting failed
    pub output_path: Option<PathBuf>,

    pub succeeded: usize,
    pub failed: usize,

    /// Set when authentication expired while this group was running
    pub aborted: Option<String>,
}

enum Work<'a> {
    Process(&'a Row),
    Collided(usize, String),
}

pub struct GroupAggregator {
    rows: Arc<RowPipeline>,
    reporter: ErrorReporter,
    output_dir: PathBuf,
    concurrency: usize,
}

impl GroupAggregator {
    pub fn new(rows: Arc<RowPipeline>, reporter: ErrorReporter, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            rows,
            reporter,
            output_dir: output_dir.into(),
            concurrency: 1,
        }
    }

    /// Rows processed at once. Results are still collected in input order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Process every row of `group` into `group_dir`, uploading to
    /// `folder_id`, and persist the augmented table.
    ///
    /// Never fails: row failures become empty links, and a table that cannot
    /// be written is reported and leaves `output_path` unset.
    pub async fn run(&self, group: &Group, group_dir: &Path, folder_id: &str) -> GroupOutcome {
        info!(group = %group.name, rows = group.rows.len(), "Processing group");

        let work = self.plan(group);
        let aborted: Mutex<Option<String>> = Mutex::new(None);

        let outcomes: Vec<RowOutcome> = stream::iter(work)
            .map(|item| {
                let aborted = &aborted;
                async move {
                    let row = match item {
                        Work::Process(row) => row,
                        Work::Collided(position, reason) => {
                            return RowOutcome::failed(position, reason)
                        }
                    };
                    if abort_reason(aborted).is_some() {
                        return RowOutcome::failed(row.position, SKIPPED_AFTER_AUTH_EXPIRY);
                    }

                    match self.rows.process(row, group_dir, folder_id).await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            let mut guard = aborted.lock().unwrap_or_else(|p| p.into_inner());
                            guard.get_or_insert_with(|| err.to_string());
                            RowOutcome::failed(row.position, err.to_string())
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let aborted = abort_reason(&aborted);
        let succeeded = outcomes.iter().filter(|o| o.is_completed()).count();
        let failed = outcomes.len() - succeeded;

        let links: Vec<String> = outcomes.iter().map(|o| o.link().to_string()).collect();
        let output = group.table.with_links(&links);

        let path = output_path(&self.output_dir, &group.name);
        let output_path = match output.write_csv(&path) {
            Ok(()) => Some(path),
            Err(err) => {
                self.reporter.report(&err, &group.name);
                None
            }
        };

        if let Some(reason) = &aborted {
            warn!(group = %group.name, reason = %reason, "Group aborted");
        }
        info!(
            group = %group.name,
            rows = outcomes.len(),
            succeeded,
            failed,
            persisted = output_path.is_some(),
            "Group finished"
        );

        GroupOutcome {
            name: group.name.clone(),
            output,
            output_path,
            succeeded,
            failed,
            aborted,
        }
    }

    /// Decide which rows run. A row whose file name an earlier row of the
    /// group already claims is reported as a collision and never runs.
    fn plan<'a>(&self, group: &'a Group) -> Vec<Work<'a>> {
        // Keys are lowercased: case-insensitive filesystems merge them too.
        let mut claimed: HashMap<String, usize> = HashMap::new();

        group
            .rows
            .iter()
            .map(|row| {
                let file_name = self.rows.file_name(row);
                match claimed.get(&file_name.to_lowercase()) {
                    Some(&first) => {
                        let err = PipelineError::Collision {
                            file_name,
                            first_row: first + 1,
                        };
                        self.reporter.report(&err, &row.identity());
                        Work::Collided(row.position, err.to_string())
                    }
                    None => {
                        claimed.insert(file_name.to_lowercase(), row.position);
                        Work::Process(row)
                    }
                }
            })
            .collect()
    }
}

fn abort_reason(aborted: &Mutex<Option<String>>) -> Option<String> {
    aborted.lock().unwrap_or_else(|p| p.into_inner()).clone()
}
