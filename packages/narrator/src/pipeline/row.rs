//! One row: sanitized name → synthesized audio → published artifact.

use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::reporter::ErrorReporter;
use crate::synth::MediaSynthesizer;
use crate::types::{Row, RowOutcome};
use crate::upload::RemoteUploader;

pub struct RowPipeline {
    synthesizer: MediaSynthesizer,
    uploader: RemoteUploader,
    reporter: ErrorReporter,
}

impl RowPipeline {
    pub fn new(synthesizer: MediaSynthesizer, uploader: RemoteUploader, reporter: ErrorReporter) -> Self {
        Self {
            synthesizer,
            uploader,
            reporter,
        }
    }

    /// File name a row's artifact gets, locally and remotely.
    pub fn file_name(&self, row: &Row) -> String {
        row.file_name(self.synthesizer.voice().response_format.extension())
    }

    /// Run one row through synthesis and upload.
    ///
    /// Failures are reported and turned into [`RowOutcome::Failed`]. The only
    /// error returned is [`PipelineError::AuthExpired`], already reported,
    /// which means no later upload can succeed either.
    pub async fn process(&self, row: &Row, group_dir: &Path, folder_id: &str) -> Result<RowOutcome> {
        let context = row.identity();
        let format = self.synthesizer.voice().response_format;
        let file_name = row.file_name(format.extension());
        let destination = group_dir.join(&file_name);

        let local_path = match self.synthesizer.synthesize(&row.text, &destination).await {
            Ok(path) => path,
            Err(err) => {
                let err = PipelineError::from(err);
                self.reporter.report(&err, &context);
                return Ok(RowOutcome::failed(row.position, err.to_string()));
            }
        };

        match self
            .uploader
            .upload(&local_path, &file_name, format.mime_type(), folder_id)
            .await
        {
            Ok(artifact) => {
                debug!(row = %context, url = %artifact.shareable_url, "Row completed");
                Ok(RowOutcome::Completed(artifact))
            }
            Err(err) if err.is_auth_expired() => {
                let err = PipelineError::AuthExpired(err.to_string());
                self.reporter.report(&err, &context);
                Err(err)
            }
            Err(err) => {
                let err = PipelineError::from(err);
                self.reporter.report(&err, &context);
                Ok(RowOutcome::failed(row.position, err.to_string()))
            }
        }
    }
}
