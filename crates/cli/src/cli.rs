use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Release-notes summarizer.
///
/// Reads correlated release data from the data directory, summarizes it with
/// the configured LLM provider and writes the result next to the input.
#[derive(Parser, Debug)]
#[command(name = "relnotes", about = "Summarize release notes with an LLM")]
pub struct CliArgs {
    /// Config profile; every key is looked up as `{PROFILE}_{KEY}` first
    #[arg(long, env = "RELNOTES_PROFILE")]
    pub profile: Option<String>,

    /// Override DATA_DIR
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Override CONFIG_DIR
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize `correlated.json` into `summary.txt`, or a markdown file to stdout
    Summarize {
        /// Markdown file to summarize instead of the data directory
        #[arg(long)]
        input: Option<PathBuf>,

        /// Prefix `summary.txt` with `Release Notes <VERSION>`
        #[arg(long = "release-version")]
        release_version: Option<String>,
    },

    /// Per-project summary into `projects_summary.txt`
    Projects,

    /// Show how a payload would be split and scheduled, without LLM calls
    Plan {
        /// Markdown file to plan for (default: rendered `correlated.json`)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Send a one-line prompt to the configured provider
    #[command(name = "check-llm")]
    CheckLlm,
}
