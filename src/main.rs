#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use anyhow::{Context, Result};
use clap::Parser;
use safe_outputs::SafeOutputsConfig;
use safe_outputs::authorize::RepoSlug;
use safe_outputs::diagnostics::create_sink;
use safe_outputs::gatekeeper::RateLimitGate;
use safe_outputs::pipeline::Pipeline;
use safe_outputs::platform::GitHubClient;
use safe_outputs::platform::github::DEFAULT_API_URL;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Validate, sanitize and execute the operations an agent proposed.
#[derive(Debug, Parser)]
#[command(name = "safe-outputs", version, about)]
struct Cli {
    /// Configuration file (TOML, or JSON with a `.json` extension)
    #[arg(long)]
    config: PathBuf,

    /// Agent output: newline-delimited JSON records
    #[arg(long)]
    input: PathBuf,

    /// Preview only; nothing is sent to the platform
    #[arg(long)]
    staged: bool,

    /// Write the JSON summary here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write a markdown rendering of the summary
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Check this user's recent runs against the per-user limit first
    #[arg(long)]
    actor: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let mut config = SafeOutputsConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    if cli.staged {
        config.staged = true;
    }

    let token = std::env::var("GITHUB_TOKEN").ok();
    let api_url = std::env::var("GITHUB_API_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = GitHubClient::new(&api_url, token.as_deref())?;

    if let Some(actor) = cli.actor.as_deref() {
        let repository = RepoSlug::parse(&config.repository)?;
        let decision = RateLimitGate::from_config(&config.gatekeeper)
            .check(&client, &repository, actor, chrono::Utc::now())
            .await;
        if !decision.allowed {
            tracing::warn!(
                actor,
                counted_runs = decision.counted_runs,
                "Run denied by per-user rate limit"
            );
            println!("{}", serde_json::to_string_pretty(&decision)?);
            return Ok(());
        }
    }

    let input = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("Failed to read agent output {}", cli.input.display()))?;

    let sink = create_sink(&config.diagnostics);
    let summary = Pipeline::new(&config, &client, sink.as_ref())
        .run(&input)
        .await?;

    let json = serde_json::to_string_pretty(&summary)?;
    match &cli.output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write summary {}", path.display()))?,
        None => println!("{json}"),
    }
    if let Some(path) = &cli.markdown {
        tokio::fs::write(path, summary.render_markdown())
            .await
            .with_context(|| format!("Failed to write markdown {}", path.display()))?;
    }

    if let Some(err) = summary.errors.iter().find(|e| e.index.is_none()) {
        anyhow::bail!("batch failed: {err}");
    }
    Ok(())
}
