//! Run-scoped failure log and counter.
//!
//! Every component reports failures here instead of letting them escape. The
//! counter and the log append are updated inside the same critical section,
//! so concurrent workers never interleave records or miscount.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, warn};

const DIVIDER: &str = "------------------------------------------------------------";

struct ReporterState {
    count: u64,
    sink: Box<dyn Write + Send>,
}

/// Cheaply cloneable handle to the run's error log.
#[derive(Clone)]
pub struct ErrorReporter {
    state: Arc<Mutex<ReporterState>>,
}

impl ErrorReporter {
    /// Open (or create) the log file at `path` in append mode.
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_sink(Box::new(io::BufWriter::new(file))))
    }

    /// Report into an arbitrary writer.
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState { count: 0, sink })),
        }
    }

    /// Count nothing to disk; records are dropped. Useful for dry runs.
    pub fn discard() -> Self {
        Self::with_sink(Box::new(io::sink()))
    }

    /// Record a failure. Never fails: problems writing the log are only traced.
    pub fn report(&self, err: &(dyn std::error::Error + 'static), context: &str) {
        let mut state = self.lock();
        state.count += 1;

        warn!(context, "Error reported ({} so far)", state.count);
        debug!(context, error = %err, "Reported error detail");

        let record = format_record(err, context);
        let sink = &mut state.sink;
        if let Err(e) = sink.write_all(record.as_bytes()).and_then(|_| sink.flush()) {
            error!(error = %e, "Failed to append to error log");
        }
    }

    /// Number of failures reported so far.
    pub fn count(&self) -> u64 {
        self.lock().count
    }

    /// Flush buffered records.
    pub fn flush(&self) {
        if let Err(e) = self.lock().sink.flush() {
            error!(error = %e, "Failed to flush error log");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        // Poisoning is ignored: count and sink are valid between any two statements.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn format_record(err: &(dyn std::error::Error + 'static), context: &str) -> String {
    let mut record = String::new();
    record.push_str(DIVIDER);
    record.push('\n');
    record.push_str(&format!("Time: {}\n", Utc::now().to_rfc3339()));
    if !context.is_empty() {
        record.push_str(&format!("Context: {}\n", context));
    }
    record.push_str(&format!("{}\n", err));

    let mut source = err.source();
    while let Some(cause) = source {
        record.push_str(&format!("Caused by: {}\n", cause));
        source = cause.source();
    }
    record.push('\n');
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_report_increments_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_log").join("error.txt");
        let reporter = ErrorReporter::open(&path).unwrap();

        let err = PipelineError::Config("missing folder for Episode1".into());
        reporter.report(&err, "Episode1");
        reporter.report(&err, "");

        assert_eq!(reporter.count(), 2);

        let log = std::fs::read_to_string(&path).unwrap();
        assert_eq!(log.matches(DIVIDER).count(), 2);
        assert_eq!(log.matches("Context: Episode1").count(), 1);
        assert_eq!(
            log.matches("configuration error: missing folder for Episode1").count(),
            2
        );
    }

    #[test]
    fn test_cause_chain_written_as_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error.txt");
        let reporter = ErrorReporter::open(&path).unwrap();

        let err = PipelineError::DirectoryProvision {
            path: "out/Episode1".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        reporter.report(&err, "out/Episode1");

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("Caused by: permission denied"));
    }

    #[test]
    fn test_log_is_appended_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error.txt");
        let err = PipelineError::Config("boom".into());

        ErrorReporter::open(&path).unwrap().report(&err, "first");
        let second = ErrorReporter::open(&path).unwrap();
        second.report(&err, "second");

        // The counter is scoped to one run; the log is not.
        assert_eq!(second.count(), 1);
        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("Context: first"));
        assert!(log.contains("Context: second"));
    }

    #[tokio::test]
    async fn test_concurrent_reports_are_all_counted() {
        let reporter = ErrorReporter::discard();
        let mut handles = Vec::new();
        for i in 0..16 {
            let reporter = reporter.clone();
            handles.push(tokio::spawn(async move {
                let err = PipelineError::Config(format!("worker {}", i));
                for _ in 0..25 {
                    reporter.report(&err, "worker");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(reporter.count(), 400);
    }
}
