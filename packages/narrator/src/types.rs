//! Data model shared by the pipeline stages.

use std::path::PathBuf;

use crate::sanitize::sanitize;
use crate::table::GroupTable;

/// One input row. Read once from the input table and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Group (sheet) the row belongs to
    pub group: String,

    /// Zero-based position within the group
    pub position: usize,

    pub title: String,

    /// Ordinal as written in the source; may or may not be numeric
    pub index: String,

    pub text: String,
}

impl Row {
    /// `sanitize(title) + "_" + sanitize(index)`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", sanitize(&self.title), sanitize(&self.index))
    }

    /// File name used both locally and remotely.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem(), extension)
    }

    /// Identity used as error-log context.
    pub fn identity(&self) -> String {
        format!(
            "group={} title={} index={}",
            self.group, self.title, self.index
        )
    }
}

/// A named, ordered batch of rows plus the table they were read from.
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub table: GroupTable,
    pub rows: Vec<Row>,
}

/// The audio produced for one row plus its remote identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub local_path: PathBuf,
    pub remote_object_id: String,
    pub shareable_url: String,
    pub mime_type: String,
}

/// Marks a row whose pipeline did not complete. Details are in the error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMarker {
    pub position: usize,
    pub reason: String,
}

/// Terminal result of processing one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Completed(Artifact),
    Failed(FailureMarker),
}

impl RowOutcome {
    pub fn failed(position: usize, reason: impl Into<String>) -> Self {
        RowOutcome::Failed(FailureMarker {
            position,
            reason: reason.into(),
        })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RowOutcome::Completed(_))
    }

    /// Value written to the link column: the share URL, or empty on failure.
    pub fn link(&self) -> &str {
        match self {
            RowOutcome::Completed(artifact) => &artifact.shareable_url,
            RowOutcome::Failed(_) => "",
        }
    }
}
