//! Idempotent directory creation with a log-and-continue failure policy.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PipelineError;
use crate::reporter::ErrorReporter;

pub struct DirectoryProvisioner {
    reporter: ErrorReporter,
}

impl DirectoryProvisioner {
    pub fn new(reporter: ErrorReporter) -> Self {
        Self { reporter }
    }

    /// Make sure `base/name` exists and return its path.
    ///
    /// An existing directory is success. Any other failure is reported with
    /// the target path as context and the path is still returned: a later
    /// write into it surfaces its own error.
    pub fn ensure(&self, base: impl AsRef<Path>, name: &str) -> PathBuf {
        self.ensure_path(base.as_ref().join(name))
    }

    /// [`ensure`](Self::ensure) for a path that is already joined.
    pub fn ensure_path(&self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();

        match std::fs::create_dir_all(&path) {
            Ok(()) => debug!(path = %path.display(), "Directory ready"),
            Err(source) => {
                let context = path.display().to_string();
                let err = PipelineError::DirectoryProvision {
                    path: path.clone(),
                    source,
                };
                self.reporter.report(&err, &context);
            }
        }

        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_twice_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ErrorReporter::discard();
        let provisioner = DirectoryProvisioner::new(reporter.clone());

        let first = provisioner.ensure(dir.path(), "Episode1");
        let second = provisioner.ensure(dir.path(), "Episode1");

        assert_eq!(first, second);
        assert!(first.is_dir());
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn test_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = DirectoryProvisioner::new(ErrorReporter::discard());

        let path = provisioner.ensure(dir.path().join("run").join("audio"), "Episode1");

        assert!(path.is_dir());
        assert!(path.ends_with("run/audio/Episode1"));
    }

    #[test]
    fn test_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let log_path = dir.path().join("error.txt");
        let reporter = ErrorReporter::open(&log_path).unwrap();
        let provisioner = DirectoryProvisioner::new(reporter.clone());

        let path = provisioner.ensure(&blocker, "Episode1");

        assert_eq!(path, blocker.join("Episode1"));
        assert!(!path.exists());
        assert_eq!(reporter.count(), 1);
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains(&format!("Context: {}", path.display())));
    }
}
