//! Splitter configuration and output types.

use serde::{Deserialize, Serialize};

/// Group name for chunks outside any level-1 section.
pub const GENERAL_SECTION: &str = "General";

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum tokens per chunk.
    pub max_tokens: usize,
    /// Words carried from one sub-chunk into the next when a section is split
    /// (best effort, dropped when it would break the budget).
    pub overlap_tokens: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 40_000,
            overlap_tokens: 200,
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub token_count: usize,
    /// Position in the split sequence, 0-based.
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Header text of the originating section; empty for preamble text.
    pub section_title: String,
    /// Header level 1-4, or 0 for text before the first header.
    pub section_level: u8,
    /// Title of the nearest enclosing header.
    pub parent_section: Option<String>,
    /// Title of the enclosing level-1 section; empty when there is none.
    pub semantic_section: String,
    /// A single sentence that alone exceeds the token budget.
    pub oversized: bool,
}

/// A bounded slice of the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Grouping key used when summaries are reassembled.
    pub fn section_key(&self) -> &str {
        if self.metadata.semantic_section.is_empty() {
            GENERAL_SECTION
        } else {
            &self.metadata.semantic_section
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Content with its section header restored, as sent to the model.
    pub fn render(&self) -> String {
        let level = self.metadata.section_level as usize;
        if level == 0 || self.metadata.section_title.is_empty() {
            return self.content.clone();
        }
        format!(
            "{} {}\n\n{}",
            "#".repeat(level),
            self.metadata.section_title,
            self.content
        )
    }
}
