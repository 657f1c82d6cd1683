//! Batch execution of chunk summaries.

use futures::future::join_all;
use relnotes_llm::LlmError;
use tracing::{debug, info, warn};

use super::types::{ChunkPriority, ProcessedChunk, ProcessingOrder};
use super::ChunkManager;
use crate::prompt::SummaryChain;
use crate::splitter::Chunk;

pub(crate) struct DispatchOutcome {
    /// Results in completion order of batches.
    pub processed: Vec<ProcessedChunk>,
    pub batches_run: usize,
    /// Why dispatch stopped early, if it did.
    pub halted: Option<String>,
}

pub fn error_marker(chunk_index: usize, reason: &str) -> String {
    format!("[Error processing chunk {chunk_index}: {reason}]")
}

fn processed(chunk: &Chunk, priority: &ChunkPriority, summary: String, failed: bool) -> ProcessedChunk {
    ProcessedChunk {
        content: chunk.content.clone(),
        summary,
        metadata: chunk.metadata.clone(),
        priority: priority.clone(),
        failed,
    }
}

impl ChunkManager {
    /// Run the batches in order. The coordinator takes one limiter slot per
    /// chunk before the batch starts; the calls of a batch then run
    /// concurrently. A failing call becomes an error marker in its slot.
    /// Rate-limit exhaustion, local or reported by the provider, stops
    /// dispatch after the current batch.
    pub(crate) async fn dispatch(
        &self,
        chunks: &[Chunk],
        priorities: &[ChunkPriority],
        order: &ProcessingOrder,
        chain: &dyn SummaryChain,
    ) -> DispatchOutcome {
        let timeout = self.options.chunk_timeout;
        let mut results = Vec::with_capacity(chunks.len());
        let mut halted: Option<String> = None;
        let mut batches_run = 0;

        for (batch_no, batch) in order.batches.iter().enumerate() {
            let mut admitted = Vec::with_capacity(batch.len());
            for &idx in batch {
                if chunks[idx].is_blank() {
                    // Nothing to summarize; keep the slot so the chunk counts as done.
                    results.push(processed(&chunks[idx], &priorities[idx], String::new(), false));
                    continue;
                }
                match self.limiter.acquire().await {
                    Ok(()) => admitted.push(idx),
                    Err(e) => {
                        warn!(chunk = idx, error = %e, "rate limit exhausted, halting dispatch");
                        halted = Some(e.to_string());
                        break;
                    }
                }
            }

            batches_run += 1;
            debug!(batch = batch_no, chunks = ?admitted, "dispatching batch");

            let calls = admitted.iter().map(|&idx| {
                let prompt = chunks[idx].render();
                async move {
                    let result = tokio::time::timeout(timeout, chain.invoke(&prompt)).await;
                    (idx, result)
                }
            });

            for (idx, result) in join_all(calls).await {
                let (summary, failed) = match result {
                    Ok(Ok(summary)) => (summary, false),
                    Ok(Err(e)) => {
                        warn!(chunk = idx, error = %e, "chunk summary failed");
                        if e.is_rate_limited() && halted.is_none() {
                            halted = Some(e.to_string());
                        }
                        (error_marker(idx, &e.to_string()), true)
                    }
                    Err(_) => {
                        let e = LlmError::Timeout(timeout.as_secs());
                        warn!(chunk = idx, error = %e, "chunk summary failed");
                        (error_marker(idx, &e.to_string()), true)
                    }
                };
                results.push(processed(&chunks[idx], &priorities[idx], summary, failed));
            }

            if halted.is_some() {
                break;
            }
        }

        info!(
            processed = results.len(),
            total = chunks.len(),
            batches = batches_run,
            halted = halted.is_some(),
            "chunk dispatch finished"
        );
        DispatchOutcome { processed: results, batches_run, halted }
    }
}
