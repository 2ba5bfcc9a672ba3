//! The narration pipeline.
//!
//! - [`RowPipeline`]: sanitize → synthesize → upload for one row
//! - [`GroupAggregator`]: every row of a group, in order, into an augmented table
//! - [`Orchestrator`]: preflight checks, then every group in sequence

pub mod group;
pub mod orchestrator;
pub mod row;

pub use group::{GroupAggregator, GroupOutcome, SKIPPED_AFTER_AUTH_EXPIRY};
pub use orchestrator::{Orchestrator, RunSummary};
pub use row::RowPipeline;
