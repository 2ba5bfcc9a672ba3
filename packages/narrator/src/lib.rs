//! Spreadsheet-to-Speech Narration Library
//!
//! Turns every row of a set of tables into a narrated audio file, publishes
//! each file to a remote store with a public link, and writes the link back
//! next to the original row.
//!
//! # Flow
//!
//! For every group (one input table), in order:
//!
//! - provision `<run_root>/<group>/`
//! - for every row: sanitize `title` and `index` into a file name, synthesize
//!   `text` into audio, upload it to the group's folder, share it publicly
//! - write `<output_dir>/<group>.csv` with an extra `Audio File Link` column
//!
//! A failing row gets an empty link; details land in the error log and the
//! run carries on.
//!
//! # Usage
//!
//! ```rust,ignore
//! use narrator::testing::{MockObjectStore, MockSynthesizer};
//! use narrator::{ErrorReporter, GroupAggregator, MediaSynthesizer, RemoteUploader, RowPipeline};
//!
//! let reporter = ErrorReporter::open("error_log/error.txt")?;
//! let rows = RowPipeline::new(
//!     MediaSynthesizer::new(Arc::new(MockSynthesizer::new()), voice, retry.clone()),
//!     RemoteUploader::new(Arc::new(MockObjectStore::new()), retry),
//!     reporter.clone(),
//! );
//! let aggregator = GroupAggregator::new(Arc::new(rows), reporter, "output");
//! let outcome = aggregator.run(&group, Path::new("audio/Episode1"), "folder-id").await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams to external services (SpeechSynthesizer, ObjectStore)
//! - [`synth`] - Speech synthesis implementations (OpenAI, rate limiting)
//! - [`upload`] - Remote store implementations (Google Drive)
//! - [`pipeline`] - Row, group and run orchestration
//! - [`table`] - CSV input and output tables
//! - [`testing`] - Mock implementations for testing

pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod provision;
pub mod reporter;
pub mod retry;
pub mod sanitize;
pub mod synth;
pub mod table;
pub mod testing;
pub mod traits;
pub mod types;
pub mod upload;

// Re-export core types at crate root
pub use auth::{AuthError, AuthProvider, SecretString, StaticTokenProvider, TokenCache};
pub use config::{Config, Credentials, VoiceConfig};
pub use error::{PipelineError, Result, SynthesisError, UploadError};
pub use pipeline::{GroupAggregator, GroupOutcome, Orchestrator, RowPipeline, RunSummary};
pub use provision::DirectoryProvisioner;
pub use reporter::ErrorReporter;
pub use retry::RetryPolicy;
pub use sanitize::sanitize;
pub use synth::{MediaSynthesizer, OpenAISpeech, SynthesizerExt};
pub use table::{load_tables, GroupTable, LINK_COLUMN};
pub use traits::{store::ObjectStore, synthesizer::SpeechSynthesizer};
pub use types::{Artifact, FailureMarker, Group, Row, RowOutcome};
pub use upload::{DriveStore, RemoteUploader};
