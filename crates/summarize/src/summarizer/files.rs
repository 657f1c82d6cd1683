//! File layout of the data directory.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::chunk_manager::ProcessedChunk;
use crate::error::{Result, SummarizeError};
use crate::markdown::json_to_markdown;

pub const CORRELATED_FILE: &str = "correlated.json";
pub const FEATURE_GATE_TABLE_FILE: &str = "correlated_feature_gate_table.json";
pub const PAYLOAD_FILE: &str = "release_notes_payload.txt";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const PROJECTS_SUMMARY_FILE: &str = "projects_summary.txt";
pub const CHUNKS_DIR: &str = "chunks";

pub fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| SummarizeError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn read_markdown(path: &Path) -> Result<String> {
    Ok(json_to_markdown(&read_json(path)?, 1))
}

/// Markdown payload for the release summary: the feature-gate table when
/// present, then the correlated release information.
pub fn render_release_payload(data_dir: &Path) -> Result<String> {
    let correlated = read_markdown(&data_dir.join(CORRELATED_FILE))?;
    let gates_path = data_dir.join(FEATURE_GATE_TABLE_FILE);
    if gates_path.exists() {
        let gates = read_markdown(&gates_path)?;
        return Ok(format!("FeatureGates:\n{gates}\nRelease information:\n{correlated}"));
    }
    Ok(format!("Release information:\n{correlated}"))
}

/// Write `text` to `path`, creating parent directories. Last write wins.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SummarizeError::io(parent, e))?;
    }
    std::fs::write(path, text).map_err(|e| SummarizeError::io(path, e))?;
    debug!(path = %path.display(), bytes = text.len(), "wrote file");
    Ok(())
}

/// One markdown file per chunk summary, named by chunk index.
pub fn persist_chunk_summaries(dir: &Path, chunks: &[ProcessedChunk]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let path = dir.join(format!("chunk_{:03}.md", chunk.metadata.chunk_index));
        let title = if chunk.metadata.section_title.is_empty() {
            "(preamble)"
        } else {
            &chunk.metadata.section_title
        };
        let body = format!(
            "<!-- chunk {} of {} | section: {} | tokens: {} | importance: {:.2} -->\n\n{}\n",
            chunk.metadata.chunk_index + 1,
            chunk.metadata.total_chunks,
            title,
            chunk.metadata.token_count,
            chunk.priority.importance,
            chunk.summary
        );
        write_text(&path, &body)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "persisted chunk summaries");
    Ok(written)
}

/// Prefix the summary file with a `Release Notes <version>` line.
pub fn prepend_release_version(path: &Path, version: &str) -> Result<()> {
    let current = std::fs::read_to_string(path).map_err(|e| SummarizeError::io(path, e))?;
    write_text(path, &format!("Release Notes {version}\n{current}"))
}
