pub mod budget;
pub mod chunk_manager;
pub mod error;
pub mod markdown;
pub mod prompt;
pub mod splitter;
pub mod summarizer;
pub mod tokenizer;

pub use budget::{ChunkPlan, TokenBudget, SAFETY_MARGIN_TOKENS};
pub use chunk_manager::{
    ChunkManager, ChunkPriority, ChunkSchedule, ManagerOptions, ProcessedChunk, ProcessingOrder,
    RunMetadata, SummaryReport,
};
pub use error::{Result, SummarizeError};
pub use markdown::{json_to_markdown, strip_part_markers};
pub use prompt::{LlmSummaryChain, PromptTemplate, PromptTemplates, SummaryChain};
pub use splitter::{Chunk, ChunkMetadata, SemanticSplitter, SplitterConfig};
pub use summarizer::{RunState, Summarizer, SummaryPath};
pub use tokenizer::{counter_for, TokenCounter, TokenizerError, TokenizerKind};
