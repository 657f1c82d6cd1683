//! Entry point of a summarization run.
//!
//! A run checks the payload against the input budget and either sends it in
//! one call or hands it to the [`ChunkManager`]. Both paths end with the same
//! cleanup of chunk-numbering artifacts.

mod files;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use relnotes_core::{Config, ConfigError};
use relnotes_llm::{
    BucketConfig, BucketLimiter, DailyLimiter, LazyProvider, LlmProvider, RateLimitedProvider,
};
use tracing::{info, warn};

use crate::budget::{ChunkPlan, TokenBudget};
use crate::chunk_manager::{ChunkManager, ChunkSchedule, ManagerOptions, SummaryReport};
use crate::error::{Result, SummarizeError};
use crate::markdown::strip_part_markers;
use crate::prompt::{LlmSummaryChain, PromptTemplate, PromptTemplates, SummaryChain};
use crate::splitter::{SemanticSplitter, SplitterConfig};
use crate::tokenizer::{counter_for, TokenCounter, TokenizerKind};

pub use files::{
    persist_chunk_summaries, prepend_release_version, read_json, read_markdown,
    render_release_payload, write_text, CHUNKS_DIR, CORRELATED_FILE, FEATURE_GATE_TABLE_FILE,
    PAYLOAD_FILE, PROJECTS_SUMMARY_FILE, SUMMARY_FILE,
};
pub use state::{RunState, SummaryPath};

use state::RunTracker;

pub struct Summarizer {
    config: Config,
    counter: Arc<dyn TokenCounter>,
    templates: PromptTemplates,
    /// Provider used for chunk and reduce calls; the bucket limiter governs it.
    provider: Arc<dyn LlmProvider>,
    /// Provider used for single-shot calls, counted against the daily budget.
    single_shot: Arc<RateLimitedProvider>,
    bucket: Arc<BucketLimiter>,
}

impl Summarizer {
    /// Build a summarizer for the configured provider. The provider itself is
    /// constructed on first use.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let templates = PromptTemplates::load(&config.paths.config_dir)?;
        let provider: Arc<dyn LlmProvider> = Arc::new(LazyProvider::new(config.llm.clone()));
        Self::with_provider(config, provider, templates)
    }

    pub fn with_provider(
        config: Config,
        provider: Arc<dyn LlmProvider>,
        templates: PromptTemplates,
    ) -> Result<Self> {
        config.validate()?;
        let kind: TokenizerKind = config.tokens.tokenizer.parse()?;
        let counter = counter_for(kind)?;
        let daily = DailyLimiter::new(config.rate_limit.requests_per_day)?;
        let bucket = BucketLimiter::new(BucketConfig::from_config(&config.rate_limit)?);

        info!(
            tokenizer = counter.name(),
            provider = %config.llm.provider,
            model = %config.llm.active_model(),
            "summarizer ready"
        );
        Ok(Self {
            single_shot: Arc::new(RateLimitedProvider::new(provider.clone(), daily)),
            bucket: Arc::new(bucket),
            config,
            counter,
            templates,
            provider,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    pub fn bucket(&self) -> &BucketLimiter {
        &self.bucket
    }

    pub fn daily_limiter(&self) -> &DailyLimiter {
        self.single_shot.limiter()
    }

    // ── Runs ────────────────────────────────────────────────────────────────

    /// Summarize `text` with the release template. Empty or missing input
    /// yields an empty report without calling the provider.
    pub async fn summarize_text(&self, text: Option<&str>) -> Result<SummaryReport> {
        self.run(text, &self.templates.summarize).await
    }

    /// Render `correlated.json`, keep the payload on disk, summarize it and
    /// write `summary.txt`.
    pub async fn summarize_correlated(&self) -> Result<SummaryReport> {
        let data_dir = &self.config.paths.data_dir;
        let payload = render_release_payload(data_dir)?;
        write_text(&data_dir.join(PAYLOAD_FILE), &payload)?;

        let report = self.run(Some(&payload), &self.templates.summarize).await?;
        write_text(&self.summary_path(), &report.final_summary)?;
        info!(path = ?report.metadata.path, chars = report.final_summary.len(), "release summary written");
        Ok(report)
    }

    /// Per-project summary of `correlated.json`, written to
    /// `projects_summary.txt`.
    pub async fn summarize_projects(&self) -> Result<SummaryReport> {
        let data_dir = &self.config.paths.data_dir;
        let payload = read_markdown(&data_dir.join(CORRELATED_FILE))?;

        let report = self.run(Some(&payload), &self.templates.project).await?;
        write_text(&data_dir.join(PROJECTS_SUMMARY_FILE), &report.final_summary)?;
        info!(path = ?report.metadata.path, "projects summary written");
        Ok(report)
    }

    /// [`Self::summarize_correlated`] unless summarization is disabled.
    pub async fn summarize(&self) -> Result<SummaryReport> {
        if !self.config.processing.summarize_enabled {
            info!("summarization disabled, skipping");
            return Ok(SummaryReport::empty(
                SummaryPath::Skipped,
                self.config.processing.reduce_enabled,
            ));
        }
        self.summarize_correlated().await
    }

    /// Blocking wrapper around [`Self::summarize_text`]. Inside a tokio
    /// runtime this returns [`SummarizeError::Runtime`]; await
    /// `summarize_text` there instead.
    pub fn summarize_blocking(&self, text: Option<&str>) -> Result<SummaryReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SummarizeError::Runtime(
                "summarize_blocking called from within an async runtime".into(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SummarizeError::Runtime(e.to_string()))?;
        runtime.block_on(self.summarize_text(text))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.config.paths.data_dir.join(SUMMARY_FILE)
    }

    /// Prefix `summary.txt` with the release version.
    pub fn prepend_release_version(&self, version: &str) -> Result<()> {
        prepend_release_version(&self.summary_path(), version)
    }

    async fn run(&self, text: Option<&str>, template: &PromptTemplate) -> Result<SummaryReport> {
        let mut tracker = RunTracker::new();
        tracker.advance(RunState::SizeCheck);

        let text = text.unwrap_or_default();
        if text.trim().is_empty() {
            info!("no content to summarize");
            tracker.advance(RunState::Done);
            return Ok(SummaryReport::empty(
                SummaryPath::Empty,
                self.config.processing.reduce_enabled,
            ));
        }

        let payload_tokens = self.counter.count_tokens(text)?;
        let budget = self.budget_for(template)?;
        info!(
            payload_tokens,
            template_tokens = budget.template_tokens,
            available = budget.available(),
            local = self.config.llm.is_local(),
            "size check"
        );

        let mut report = if self.config.llm.is_local() || budget.fits(payload_tokens) {
            tracker.advance(RunState::SingleShot);
            let chain = self.chain(self.single_shot.clone(), template.clone());
            let summary = chain.invoke(text).await?;
            SummaryReport::single_shot(summary, payload_tokens)
        } else {
            tracker.advance(RunState::Chunked);
            let manager = self.chunk_manager(&budget)?;
            let chain = self.chain(self.provider.clone(), template.clone());
            let report = manager.process_text(Some(text), &chain).await?;
            if self.config.processing.persist_chunk_summaries {
                let dir = self.config.paths.data_dir.join(CHUNKS_DIR);
                persist_chunk_summaries(&dir, &report.chunk_summaries)?;
            }
            report
        };

        tracker.advance(RunState::Cleanup);
        report.final_summary = strip_part_markers(&report.final_summary);

        tracker.advance(RunState::Done);
        info!(
            path = ?report.metadata.path,
            chunks = report.metadata.total_chunks,
            failed = report.metadata.failed_chunks.len(),
            halted = report.metadata.halted,
            states = ?tracker.history(),
            "summarization finished"
        );
        Ok(report)
    }

    /// Preview how `text` would be processed with the release template,
    /// without calling the provider.
    pub fn chunk_plan(&self, text: &str) -> Result<ChunkPlan> {
        let budget = self.budget_for(&self.templates.summarize)?;
        let total_tokens = self.counter.count_tokens(text)?;
        let needs_chunking = !self.config.llm.is_local() && !budget.fits(total_tokens);
        let manager = self.chunk_manager(&budget)?;
        let ChunkSchedule { chunks, order, .. } = manager.schedule(text)?;

        Ok(ChunkPlan {
            total_tokens,
            available_tokens: budget.available(),
            needs_chunking,
            chunk_budget: budget.chunk_budget(self.config.tokens.chunk_size).unwrap_or(0),
            chunk_count: chunks.len(),
            chunk_tokens: chunks.iter().map(|c| c.metadata.token_count).collect(),
            oversized_chunks: chunks
                .iter()
                .filter(|c| c.metadata.oversized)
                .map(|c| c.metadata.chunk_index)
                .collect(),
            batches: order.batches,
        })
    }

    // ── Assembly ────────────────────────────────────────────────────────────

    fn budget_for(&self, template: &PromptTemplate) -> Result<TokenBudget> {
        let template_tokens = self.counter.count_tokens(&template.overhead())?;
        Ok(TokenBudget::new(self.config.tokens.max_input_tokens, template_tokens))
    }

    fn chain(&self, provider: Arc<dyn LlmProvider>, template: PromptTemplate) -> LlmSummaryChain {
        LlmSummaryChain::new(
            provider,
            template,
            self.config.llm.temperature,
            self.config.llm.max_tokens,
        )
    }

    fn chunk_manager(&self, budget: &TokenBudget) -> Result<ChunkManager> {
        let chunk_budget = budget.chunk_budget(self.config.tokens.chunk_size).ok_or_else(|| {
            ConfigError::Invalid {
                key: "MAX_INPUT_TOKENS",
                reason: format!(
                    "no room for input after {} template tokens and {} safety margin",
                    budget.template_tokens, budget.safety_margin
                ),
            }
        })?;
        if chunk_budget < self.config.tokens.chunk_size {
            warn!(
                chunk_size = self.config.tokens.chunk_size,
                chunk_budget, "chunk size capped by input budget"
            );
        }

        let splitter = SemanticSplitter::new(
            SplitterConfig {
                max_tokens: chunk_budget,
                overlap_tokens: self.config.tokens.chunk_overlap,
            },
            self.counter.clone(),
        );
        let reduce_budget = self.budget_for(&self.templates.reduce)?;
        let options = ManagerOptions {
            max_parallel_chunks: self.config.rate_limit.max_parallel_chunks,
            chunk_timeout: Duration::from_secs(self.config.rate_limit.chunk_timeout_secs),
            reduce_enabled: self.config.processing.reduce_enabled,
            reduce_max_tokens: reduce_budget.available(),
        };

        let manager = ChunkManager::new(splitter, self.counter.clone(), self.bucket.clone(), options);
        if !self.config.processing.reduce_enabled {
            return Ok(manager);
        }
        let reducer: Arc<dyn SummaryChain> =
            Arc::new(self.chain(self.provider.clone(), self.templates.reduce.clone()));
        Ok(manager.with_reducer(reducer))
    }
}
