//! Map-reduce over chunks: score, schedule, summarize, merge.
//!
//! ```text
//! text ─► SemanticSplitter ─► priorities ─► batches ─► dispatch ─► merge ─► (reduce)
//! ```
//!
//! Chunk-level failures degrade to inline markers; only tokenizer errors
//! abort a run here.

mod dispatch;
mod merge;
mod order;
mod priority;
mod types;

use std::sync::Arc;

use relnotes_llm::BucketLimiter;
use tracing::{info, warn};

use crate::error::Result;
use crate::prompt::SummaryChain;
use crate::splitter::{Chunk, SemanticSplitter};
use crate::summarizer::SummaryPath;
use crate::tokenizer::TokenCounter;

pub use dispatch::error_marker;
pub use merge::{merge_summaries, remove_duplicate_intros, MergedSummary, INTRO_PATTERNS};
pub use order::create_processing_order;
pub use priority::{build_priorities, calculate_importance};
pub use types::{
    ChunkPriority, ManagerOptions, ProcessedChunk, ProcessingOrder, RunMetadata, SummaryReport,
};

pub struct ChunkManager {
    splitter: SemanticSplitter,
    counter: Arc<dyn TokenCounter>,
    limiter: Arc<BucketLimiter>,
    options: ManagerOptions,
    reducer: Option<Arc<dyn SummaryChain>>,
}

/// Chunks with their scheduling data, before any LLM call.
#[derive(Debug, Clone)]
pub struct ChunkSchedule {
    pub chunks: Vec<Chunk>,
    pub priorities: Vec<ChunkPriority>,
    pub order: ProcessingOrder,
}

impl ChunkManager {
    pub fn new(
        splitter: SemanticSplitter,
        counter: Arc<dyn TokenCounter>,
        limiter: Arc<BucketLimiter>,
        options: ManagerOptions,
    ) -> Self {
        Self { splitter, counter, limiter, options, reducer: None }
    }

    /// Chain used for the optional final pass over the merged text.
    pub fn with_reducer(mut self, reducer: Arc<dyn SummaryChain>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn schedule(&self, text: &str) -> Result<ChunkSchedule> {
        let chunks = self.splitter.split_text(text)?;
        let priorities = build_priorities(&chunks);
        let order = create_processing_order(&priorities, self.options.max_parallel_chunks);
        Ok(ChunkSchedule { chunks, priorities, order })
    }

    /// Summarize `text` chunk by chunk. Empty or missing input yields an
    /// empty report.
    pub async fn process_text(
        &self,
        text: Option<&str>,
        chain: &dyn SummaryChain,
    ) -> Result<SummaryReport> {
        let text = text.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(SummaryReport::empty(SummaryPath::Empty, self.options.reduce_enabled));
        }

        let total_tokens = self.counter.count_tokens(text)?;
        let ChunkSchedule { chunks, priorities, order } = self.schedule(text)?;
        info!(
            chunks = chunks.len(),
            batches = order.batches.len(),
            forced = order.forced.len(),
            total_tokens,
            "processing chunks"
        );

        let outcome = self.dispatch(&chunks, &priorities, &order, chain).await;
        let merged = merge_summaries(&outcome.processed);
        let mut final_summary = merged.text;

        if outcome.halted.is_some() {
            let skipped = chunks.len() - outcome.processed.len();
            let note = format!(
                "[Rate limit exceeded: {skipped} of {} chunks were not processed]",
                chunks.len()
            );
            final_summary = if final_summary.is_empty() {
                note
            } else {
                format!("{final_summary}\n\n{note}")
            };
        } else if self.options.reduce_enabled {
            final_summary = self.reduce(final_summary).await?;
        }

        let mut chunk_summaries = outcome.processed;
        chunk_summaries.sort_by_key(|p| p.metadata.chunk_index);
        let failed_chunks = chunk_summaries
            .iter()
            .filter(|p| p.failed)
            .map(|p| p.metadata.chunk_index)
            .collect();

        Ok(SummaryReport {
            final_summary,
            metadata: RunMetadata {
                total_chunks: chunks.len(),
                total_tokens,
                sections: merged.sections.keys().cloned().collect(),
                batches: outcome.batches_run,
                failed_chunks,
                halted: outcome.halted.is_some(),
                reduce_enabled: self.options.reduce_enabled,
                path: SummaryPath::Chunked,
            },
            section_summaries: merged.sections,
            chunk_summaries,
        })
    }

    /// Final pass over the merged text. A failure keeps the merged text under
    /// an error marker.
    async fn reduce(&self, merged: String) -> Result<String> {
        let Some(reducer) = &self.reducer else {
            return Ok(merged);
        };
        if merged.trim().is_empty() {
            return Ok(merged);
        }
        let tokens = self.counter.count_tokens(&merged)?;
        if tokens > self.options.reduce_max_tokens {
            warn!(
                tokens,
                max = self.options.reduce_max_tokens,
                "merged summary too large to reduce, keeping merge"
            );
            return Ok(merged);
        }
        if let Err(e) = self.limiter.acquire().await {
            warn!(error = %e, "no request budget left for reduce, keeping merge");
            return Ok(merged);
        }

        match reducer.invoke(&merged).await {
            Ok(reduced) if !reduced.trim().is_empty() => Ok(reduced),
            Ok(_) => {
                warn!("reduce returned an empty summary, keeping merge");
                Ok(merged)
            }
            Err(e) => {
                warn!(error = %e, "reduce failed");
                Ok(format!("[Error merging chunk summaries: {e}]\n\n{merged}"))
            }
        }
    }
}

#[cfg(test)]
mod tests;
