use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use run_pruner::{
    config::{ConfigError, ConfigOverrides, PrunerConfig},
    github::{GitHubClient, RepoRef},
    observability::init_tracing,
    retention::{self, BatchSummary, DeletionOrchestrator, RetentionError, RetentionPolicy, SummaryRecord},
};

/// Exit status for fatal runtime errors (authentication, API, I/O).
const EXIT_FATAL: i32 = 1;

/// Exit status for invalid configuration or arguments.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser, Debug)]
#[command(version, about = "Prune GitHub Actions workflow runs", long_about = None)]
struct Args {
    /// Repository URL (https, ssh) or owner/name shorthand
    #[arg(long)]
    repo_url: Option<String>,

    /// Keep this many most recent runs of each workflow
    #[arg(long, allow_negative_numbers = true)]
    min_runs: Option<i64>,

    /// Keep runs created within this many days
    #[arg(long, allow_negative_numbers = true)]
    max_days: Option<i64>,

    /// Only report what would be deleted [default: true]
    #[arg(long)]
    dry_run: Option<bool>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the JSON summary record
    #[arg(long)]
    summary_path: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            repo_url: self.repo_url.clone(),
            min_runs: self.min_runs,
            max_days: self.max_days,
            dry_run: self.dry_run,
            summary_path: self.summary_path.clone(),
        }
    }
}

/// Load the config file (if any), apply command-line overrides and resolve
/// the repository and retention rule.
fn load_config(args: &Args) -> Result<(PrunerConfig, RepoRef, RetentionPolicy), ConfigError> {
    let mut config = match &args.config {
        Some(path) => PrunerConfig::from_file(path)?,
        None => PrunerConfig::default(),
    };
    config.apply_overrides(args.overrides());

    let (repo, policy) = config.resolve()?;
    Ok((config, repo, policy))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (config, repo, policy) = match load_config(&args) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FATAL);
    }

    let dry_run = config.retention.dry_run;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        repository = %repo,
        %policy,
        dry_run,
        "Starting run-pruner{}",
        if dry_run { " (DRY RUN)" } else { "" }
    );

    if let Err(e) = run(&config, repo, policy).await {
        tracing::error!(error = %e, "Pruning failed");
        std::process::exit(EXIT_FATAL);
    }
}

async fn run(
    config: &PrunerConfig,
    repo: RepoRef,
    policy: RetentionPolicy,
) -> Result<(), RetentionError> {
    let repo_url = config
        .github
        .repository
        .clone()
        .unwrap_or_else(|| repo.full_name());

    let client = GitHubClient::from_config(&config.github, repo)?;
    client.verify_repository().await?;

    let summary = retention::prune(
        &client,
        policy,
        config.retention.dry_run,
        Utc::now(),
        &DeletionOrchestrator::new(),
    )
    .await?;

    report_quota(&summary);

    let path = &config.retention.summary_path;
    SummaryRecord::new(&summary, &repo_url).write(path)?;
    tracing::info!(path = %path.display(), "Summary written");

    Ok(())
}

/// Log the quota snapshot and whether a real run fits in it.
fn report_quota(summary: &BatchSummary) {
    tracing::info!(
        limit = summary.quota_limit,
        remaining = summary.quota_remaining,
        reset_at = %summary.quota_reset_at,
        estimate = summary.quota_estimate,
        "Core API quota"
    );

    if summary.has_quota_headroom() {
        tracing::info!(
            estimate = summary.quota_estimate,
            remaining = summary.quota_remaining,
            "Remaining quota covers the estimated usage"
        );
    } else {
        tracing::warn!(
            estimate = summary.quota_estimate,
            remaining = summary.quota_remaining,
            reset_at = %summary.quota_reset_at,
            "Estimated usage exceeds 90% of the remaining quota; split the deletion across several runs"
        );
    }
}
