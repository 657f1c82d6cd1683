mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use relnotes_core::{load_dotenv, Config};
use relnotes_llm::{create_provider, LlmProvider, Message};
use relnotes_summarize::summarizer::{prepend_release_version, render_release_payload};
use relnotes_summarize::{Summarizer, SummaryPath, SummaryReport};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(dir) = args.data_dir {
        config.paths.data_dir = dir;
    }
    if let Some(dir) = args.config_dir {
        config.paths.config_dir = dir;
    }
    config.validate().context("invalid configuration")?;
    config.log_summary();

    match args.command {
        Command::Summarize { input, release_version } => {
            let summarizer = Summarizer::new(config).context("failed to build summarizer")?;
            match input {
                Some(path) => {
                    let text = read_input(&path)?;
                    let report = summarizer.summarize_text(Some(&text)).await?;
                    log_report(&report);
                    println!("{}", report.final_summary);
                }
                None => {
                    let report = summarizer.summarize().await.context("summarization failed")?;
                    log_report(&report);
                    if let Some(version) = release_version {
                        prepend_release(&report, &summarizer.summary_path(), &version)?;
                    }
                }
            }
        }
        Command::Projects => {
            let summarizer = Summarizer::new(config).context("failed to build summarizer")?;
            let report = summarizer
                .summarize_projects()
                .await
                .context("projects summarization failed")?;
            log_report(&report);
        }
        Command::Plan { input } => {
            let text = match input {
                Some(path) => read_input(&path)?,
                None => render_release_payload(&config.paths.data_dir)
                    .context("failed to render release payload")?,
            };
            let summarizer = Summarizer::new(config).context("failed to build summarizer")?;
            let plan = summarizer.chunk_plan(&text)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::CheckLlm => {
            let provider = create_provider(&config.llm).context("failed to create LLM provider")?;
            let reply = provider
                .complete(
                    vec![Message::user("Reply with the single word OK.")],
                    config.llm.temperature,
                    16,
                )
                .await
                .context("LLM provider check failed")?;
            info!(provider = %config.llm.provider, model = %config.llm.active_model(), "provider reachable");
            println!("{}", reply.trim());
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Prefix the written summary with the release version. A skipped run wrote
/// no summary, so there is nothing to prefix.
fn prepend_release(report: &SummaryReport, summary: &Path, version: &str) -> Result<bool> {
    if report.metadata.path == SummaryPath::Skipped {
        info!(version, "summarization skipped, not prepending release version");
        return Ok(false);
    }
    prepend_release_version(summary, version).context("failed to prepend release version")?;
    Ok(true)
}

fn log_report(report: &SummaryReport) {
    let meta = &report.metadata;
    info!(
        path = ?meta.path,
        chunks = meta.total_chunks,
        tokens = meta.total_tokens,
        batches = meta.batches,
        "run complete"
    );
    if !meta.failed_chunks.is_empty() {
        warn!(failed = ?meta.failed_chunks, "some chunks could not be summarized");
    }
    if meta.halted {
        warn!("rate limit reached before all chunks were processed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_run_leaves_summary_alone() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("summary.txt");
        let report = SummaryReport::empty(SummaryPath::Skipped, false);

        assert!(!prepend_release(&report, &summary, "4.2.0").unwrap());
        assert!(!summary.exists());
    }

    #[test]
    fn written_summary_gets_version_line() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("summary.txt");
        std::fs::write(&summary, "- Dark mode").unwrap();
        let report = SummaryReport::single_shot("- Dark mode".into(), 3);

        assert!(prepend_release(&report, &summary, "4.2.0").unwrap());
        assert_eq!(
            std::fs::read_to_string(&summary).unwrap(),
            "Release Notes 4.2.0\n- Dark mode"
        );
    }
}
