//! Scheduling and result types.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::splitter::ChunkMetadata;
use crate::summarizer::SummaryPath;

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Upper bound on chunks dispatched together in one batch.
    pub max_parallel_chunks: usize,
    /// Per-call timeout for a chunk summary.
    pub chunk_timeout: Duration,
    /// Send the merged text through the reduce chain when one is set.
    pub reduce_enabled: bool,
    /// Largest merged text the reduce chain may receive.
    pub reduce_max_tokens: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            max_parallel_chunks: 2,
            chunk_timeout: Duration::from_secs(300),
            reduce_enabled: false,
            reduce_max_tokens: usize::MAX,
        }
    }
}

// ── Scheduling ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPriority {
    /// Heuristic rank in [0, 1].
    pub importance: f64,
    /// Chunks of the parent section.
    pub dependencies: Vec<usize>,
    /// Chunks whose parent is this chunk's section.
    pub dependents: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingOrder {
    pub batches: Vec<Vec<usize>>,
    /// Chunks released by the cycle fallback rather than by their
    /// dependencies completing.
    pub forced: Vec<usize>,
}

impl ProcessingOrder {
    pub fn batch_of(&self, chunk_index: usize) -> Option<usize> {
        self.batches.iter().position(|b| b.contains(&chunk_index))
    }
}

// ── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedChunk {
    pub content: String,
    pub summary: String,
    pub metadata: ChunkMetadata,
    pub priority: ChunkPriority,
    /// The summary is an error marker.
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub sections: Vec<String>,
    pub batches: usize,
    pub failed_chunks: Vec<usize>,
    /// Dispatch stopped early on rate-limit exhaustion.
    pub halted: bool,
    pub reduce_enabled: bool,
    pub path: SummaryPath,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub final_summary: String,
    /// Merged summary text per semantic section, in document order.
    pub section_summaries: IndexMap<String, String>,
    /// Per-chunk results ordered by chunk index.
    pub chunk_summaries: Vec<ProcessedChunk>,
    pub metadata: RunMetadata,
}

impl SummaryReport {
    pub fn empty(path: SummaryPath, reduce_enabled: bool) -> Self {
        Self {
            final_summary: String::new(),
            section_summaries: IndexMap::new(),
            chunk_summaries: Vec::new(),
            metadata: RunMetadata {
                total_chunks: 0,
                total_tokens: 0,
                sections: Vec::new(),
                batches: 0,
                failed_chunks: Vec::new(),
                halted: false,
                reduce_enabled,
                path,
            },
        }
    }

    pub fn single_shot(summary: String, total_tokens: usize) -> Self {
        let mut report = Self::empty(SummaryPath::SingleShot, false);
        report.final_summary = summary;
        report.metadata.total_tokens = total_tokens;
        report.metadata.batches = 1;
        report
    }
}
