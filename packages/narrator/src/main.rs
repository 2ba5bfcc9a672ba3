//! CLI for a narration run
//!
//! Reads every `<group>.csv` from the input directory, narrates each row and
//! writes the augmented tables. With `--json` the run summary is printed as
//! JSON for scripts.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use narrator::config::DRIVE_ACCESS_TOKEN_VAR;
use narrator::{
    load_tables, Config, Credentials, DriveStore, ErrorReporter, GroupAggregator,
    MediaSynthesizer, OpenAISpeech, Orchestrator, RemoteUploader, RowPipeline, RunSummary,
    SpeechSynthesizer, StaticTokenProvider, SynthesizerExt, TokenCache,
};
use serde::Serialize;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "narrator")]
#[command(about = "Narrate spreadsheet rows and publish the audio with share links")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "narrator.toml")]
    config: PathBuf,

    /// Directory of input tables (overrides paths.input_dir)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Rows processed at once within a group (overrides pipeline.concurrency)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Load input and validate configuration without calling any service
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SummaryResponse {
    error_count: u64,
    minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    aborted: Option<String>,
    skipped: Vec<String>,
    groups: Vec<GroupResponse>,
}

#[derive(Serialize)]
struct GroupResponse {
    name: String,
    rows: usize,
    succeeded: usize,
    failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
}

impl From<&RunSummary> for SummaryResponse {
    fn from(summary: &RunSummary) -> Self {
        Self {
            error_count: summary.error_count,
            minutes: summary.elapsed_minutes(),
            aborted: summary.aborted.clone(),
            skipped: summary.skipped.clone(),
            groups: summary
                .groups
                .iter()
                .map(|g| GroupResponse {
                    name: g.name.clone(),
                    rows: g.output.len(),
                    succeeded: g.succeeded,
                    failed: g.failed,
                    output: g.output_path.clone(),
                })
                .collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in .env; load it before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,narrator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(input) = cli.input {
        config.paths.input_dir = input;
    }
    if let Some(concurrency) = cli.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);
    tracing::info!(config = %cli.config.display(), "Configuration loaded");

    let reporter = if cli.dry_run {
        ErrorReporter::discard()
    } else {
        ErrorReporter::open(&config.paths.error_log).with_context(|| {
            format!("Failed to open error log {}", config.paths.error_log.display())
        })?
    };

    let tables = load_tables(&config.paths.input_dir).context("Failed to load input tables")?;
    let tokens = Arc::new(TokenCache::new(Arc::new(StaticTokenProvider::from_env(
        DRIVE_ACCESS_TOKEN_VAR,
    ))));

    let orchestrator = Orchestrator::new(
        config.clone(),
        build_aggregator(&config, tokens.clone(), reporter.clone(), cli.dry_run)?,
        tokens,
        reporter,
    );

    if cli.dry_run {
        let groups = orchestrator
            .preflight(tables)
            .await
            .context("Preflight failed")?;
        let rows: usize = groups.iter().map(|g| g.rows.len()).sum();
        println!(
            "{} {} groups, {} rows ready",
            "✓".bright_green(),
            groups.len(),
            rows
        );
        return Ok(());
    }

    let summary = orchestrator.run(tables).await.context("Run aborted")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&SummaryResponse::from(&summary))?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn build_aggregator(
    config: &Config,
    tokens: Arc<TokenCache>,
    reporter: ErrorReporter,
    dry_run: bool,
) -> Result<GroupAggregator> {
    let pipeline = &config.pipeline;
    let retry = pipeline.retry_policy();

    // A dry run never synthesizes, so no API key is required.
    let api_key = if dry_run {
        String::new()
    } else {
        Credentials::from_env()?.openai_api_key.expose().to_string()
    };
    let client = openai_client::OpenAIClient::new(api_key)
        .with_timeout(pipeline.timeout())
        .context("Failed to build OpenAI client")?;

    let speech = OpenAISpeech::new(client);
    let synthesizer: Arc<dyn SpeechSynthesizer> =
        match pipeline.requests_per_second.and_then(NonZeroU32::new) {
            Some(rate) => Arc::new(speech.rate_limited(rate)),
            None => Arc::new(speech),
        };

    let drive = drive_client::DriveClient::new()
        .with_timeout(pipeline.timeout())
        .context("Failed to build Drive client")?;
    let store = Arc::new(DriveStore::new(drive, tokens));

    let rows = RowPipeline::new(
        MediaSynthesizer::new(synthesizer, config.voice.clone(), retry.clone()),
        RemoteUploader::new(store, retry),
        reporter.clone(),
    );

    Ok(GroupAggregator::new(Arc::new(rows), reporter, &config.paths.output_dir)
        .with_concurrency(pipeline.concurrency))
}

fn print_summary(summary: &RunSummary) {
    for group in &summary.groups {
        let status = if group.failed == 0 {
            "✓".bright_green()
        } else {
            "!".bright_yellow()
        };
        println!(
            "{} {}: {}/{} rows narrated",
            status,
            group.name.bold(),
            group.succeeded,
            group.output.len()
        );
    }
    if let Some(reason) = &summary.aborted {
        println!("{} Run stopped early: {}", "✗".bright_red(), reason);
        if !summary.skipped.is_empty() {
            println!("  Skipped groups: {}", summary.skipped.join(", "));
        }
    }
    println!("{}", summary.to_string().bold());
}
