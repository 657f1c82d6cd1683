use serde::Serialize;

/// Tokens held back from the input budget for the model's own framing.
pub const SAFETY_MARGIN_TOKENS: usize = 2000;

/// Input budget of one LLM call after template overhead and safety margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenBudget {
    pub max_input_tokens: usize,
    pub template_tokens: usize,
    pub safety_margin: usize,
}

impl TokenBudget {
    pub fn new(max_input_tokens: usize, template_tokens: usize) -> Self {
        Self { max_input_tokens, template_tokens, safety_margin: SAFETY_MARGIN_TOKENS }
    }

    /// Tokens left for the payload itself.
    pub fn available(&self) -> usize {
        self.max_input_tokens
            .saturating_sub(self.template_tokens)
            .saturating_sub(self.safety_margin)
    }

    pub fn fits(&self, payload_tokens: usize) -> bool {
        payload_tokens <= self.available()
    }

    /// Per-chunk budget on the chunked path: the configured chunk size, capped
    /// by what a single call can take. `None` when nothing is left.
    pub fn chunk_budget(&self, chunk_size: usize) -> Option<usize> {
        match chunk_size.min(self.available()) {
            0 => None,
            n => Some(n),
        }
    }
}

/// Dry-run view of how a payload would be processed.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPlan {
    pub total_tokens: usize,
    pub available_tokens: usize,
    pub needs_chunking: bool,
    pub chunk_budget: usize,
    pub chunk_count: usize,
    pub chunk_tokens: Vec<usize>,
    pub oversized_chunks: Vec<usize>,
    pub batches: Vec<Vec<usize>>,
}
