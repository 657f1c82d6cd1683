//! Tests for scheduling, dispatch and merge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relnotes_llm::{BucketConfig, BucketLimiter, LlmError};

use super::*;
use crate::prompt::SummaryChain;
use crate::splitter::{ChunkMetadata, SplitterConfig};
use crate::tokenizer::WhitespaceCounter;

type Respond = Box<dyn Fn(&str) -> std::result::Result<String, LlmError> + Send + Sync>;

/// Mock chain with a call counter.
struct MockChain {
    calls: AtomicUsize,
    respond: Respond,
}

impl MockChain {
    fn new(
        respond: impl Fn(&str) -> std::result::Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self { calls: AtomicUsize::new(0), respond: Box::new(respond) }
    }

    /// Summarizes a chunk as "summary: <last line>".
    fn echo() -> Self {
        Self::new(|content| Ok(format!("summary: {}", content.lines().last().unwrap_or(""))))
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryChain for MockChain {
    async fn invoke(&self, content: &str) -> std::result::Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(content)
    }
}

struct SlowChain;

#[async_trait]
impl SummaryChain for SlowChain {
    async fn invoke(&self, _content: &str) -> std::result::Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("late".into())
    }
}

fn limiter(per_day: u32) -> Arc<BucketLimiter> {
    Arc::new(BucketLimiter::new(BucketConfig {
        requests_per_minute: 1000,
        requests_per_day: per_day,
        min_request_interval: Duration::from_millis(1),
    }))
}

fn manager_with(options: ManagerOptions, limiter: Arc<BucketLimiter>) -> ChunkManager {
    let counter = Arc::new(WhitespaceCounter);
    ChunkManager::new(
        SemanticSplitter::new(
            SplitterConfig { max_tokens: 1000, overlap_tokens: 0 },
            counter.clone(),
        ),
        counter,
        limiter,
        options,
    )
}

fn manager() -> ChunkManager {
    manager_with(ManagerOptions::default(), limiter(1000))
}

fn chunk(level: u8, title: &str, parent: Option<&str>, content: &str) -> Chunk {
    Chunk {
        content: content.to_string(),
        metadata: ChunkMetadata {
            token_count: content.split_whitespace().count(),
            chunk_index: 0,
            total_chunks: 0,
            section_title: title.to_string(),
            section_level: level,
            parent_section: parent.map(String::from),
            semantic_section: String::new(),
            oversized: false,
        },
    }
}

fn processed(index: usize, section: &str, importance: f64, summary: &str) -> ProcessedChunk {
    let mut c = chunk(2, "t", None, "c");
    c.metadata.chunk_index = index;
    c.metadata.semantic_section = section.to_string();
    ProcessedChunk {
        content: c.content,
        summary: summary.to_string(),
        metadata: c.metadata,
        priority: ChunkPriority { importance, dependencies: vec![], dependents: vec![] },
        failed: false,
    }
}

fn priority(importance: f64, dependencies: Vec<usize>) -> ChunkPriority {
    ChunkPriority { importance, dependencies, dependents: vec![] }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Importance & dependencies ───────────────────────────────────────

#[test]
fn importance_by_level_and_keywords() {
    assert!(approx(calculate_importance(&chunk(1, "A", None, "plain text")), 0.8));
    assert!(approx(calculate_importance(&chunk(1, "A", None, "BREAKING: api removed")), 0.9));
    assert!(approx(calculate_importance(&chunk(2, "B", None, "plain")), 0.7));
    assert!(approx(calculate_importance(&chunk(3, "C", None, "a new toggle")), 0.7));
    assert!(approx(calculate_importance(&chunk(4, "D", None, "plain")), 0.5));
    assert!(approx(calculate_importance(&chunk(0, "", None, "Important notice")), 0.6));
}

#[test]
fn importance_never_exceeds_one() {
    let c = chunk(1, "A", None, "new feature, important and breaking");
    let score = calculate_importance(&c);
    assert!((0.0..=1.0).contains(&score));
}

#[test]
fn dependencies_follow_parent_titles() {
    let chunks = vec![
        chunk(1, "A", None, "foo"),
        chunk(2, "B", Some("A"), "bar"),
        chunk(2, "C", Some("A"), "baz"),
        chunk(3, "D", Some("B"), "qux"),
    ];
    let p = build_priorities(&chunks);
    assert_eq!(p[0].dependencies, Vec::<usize>::new());
    assert_eq!(p[0].dependents, vec![1, 2]);
    assert_eq!(p[1].dependencies, vec![0]);
    assert_eq!(p[3].dependencies, vec![1]);
    assert_eq!(p[1].dependents, vec![3]);
}

// ── Processing order ────────────────────────────────────────────────

#[test]
fn parents_run_in_earlier_batches() {
    let text = "# Release\nintro\n## Features\n- new a\n### Details\nx\n## Fixes\n- b\n### More\ny\n# Other\nz\n## Sub\nw";
    let schedule = manager().schedule(text).unwrap();

    for (i, p) in schedule.priorities.iter().enumerate() {
        for &dep in &p.dependencies {
            let parent_batch = schedule.order.batch_of(dep).unwrap();
            let child_batch = schedule.order.batch_of(i).unwrap();
            assert!(parent_batch < child_batch, "chunk {i} scheduled before its parent {dep}");
        }
    }
    assert!(schedule.order.batches.iter().all(|b| b.len() <= 2));
    assert!(schedule.order.forced.is_empty());

    let mut all: Vec<usize> = schedule.order.batches.concat();
    all.sort_unstable();
    assert_eq!(all, (0..schedule.chunks.len()).collect::<Vec<_>>());
}

#[test]
fn ready_set_sorted_by_importance_then_index() {
    let priorities = vec![
        priority(0.5, vec![]),
        priority(0.9, vec![]),
        priority(0.7, vec![]),
        priority(0.9, vec![]),
    ];
    let order = create_processing_order(&priorities, 2);
    assert_eq!(order.batches, vec![vec![1, 3], vec![2, 0]]);
}

#[test]
fn cycles_fall_back_to_importance_order() {
    let priorities = vec![priority(0.6, vec![1]), priority(0.8, vec![0])];
    let order = create_processing_order(&priorities, 1);
    assert_eq!(order.batches, vec![vec![1], vec![0]]);
    assert_eq!(order.forced, vec![1]);
}

#[test]
fn zero_parallelism_still_makes_progress() {
    let priorities = vec![priority(0.5, vec![]), priority(0.5, vec![])];
    let order = create_processing_order(&priorities, 0);
    assert_eq!(order.batches, vec![vec![0], vec![1]]);
}

// ── Merge ───────────────────────────────────────────────────────────

#[test]
fn duplicate_intro_lines_are_dropped() {
    let text = "Release Notes 4.2\n- a\nRELEASE NOTES continued\n- b";
    assert_eq!(remove_duplicate_intros(text), "Release Notes 4.2\n- a\n- b");
}

#[test]
fn line_matching_new_and_seen_patterns_is_dropped() {
    let text = "Release Notes\n\
        This document details the user-facing changes included in the Release Notes\n\
        This document details the user-facing changes included in v2";
    // The second line registers its new phrase before hitting the already-seen
    // "Release Notes", so the third line counts as a repeat.
    assert_eq!(remove_duplicate_intros(text), "Release Notes");
}

#[test]
fn merge_keeps_lead_in_once_and_all_unique_lines() {
    let intro = "This document summarizes the user-facing changes included in this software release.";
    let chunks = vec![
        processed(0, "Features", 0.8, &format!("{intro}\n- Dark mode")),
        processed(1, "Features", 0.7, &format!("{intro}\n- Faster sync")),
    ];
    let merged = merge_summaries(&chunks);

    assert_eq!(merged.text.matches(intro).count(), 1);
    assert!(merged.text.starts_with("# Features\n\n"));
    assert!(merged.text.contains("- Dark mode"));
    assert!(merged.text.contains("- Faster sync"));
}

#[test]
fn merge_groups_by_section_in_document_order() {
    let chunks = vec![
        processed(2, "Fixes", 0.7, "- crash fixed"),
        processed(0, "", 0.5, "preface summary"),
        processed(1, "Features", 0.6, "- low"),
        processed(3, "Features", 0.9, "- high"),
        processed(4, "Features", 0.9, "   "),
    ];
    let merged = merge_summaries(&chunks);

    assert_eq!(
        merged.text,
        "preface summary\n\n# Features\n\n- high\n\n- low\n\n# Fixes\n\n- crash fixed"
    );
    let keys: Vec<&str> = merged.sections.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["General", "Features", "Fixes"]);
}

#[test]
fn sections_with_only_empty_summaries_are_omitted() {
    let chunks = vec![processed(0, "Empty", 0.8, ""), processed(1, "Full", 0.8, "x")];
    let merged = merge_summaries(&chunks);
    assert_eq!(merged.text, "# Full\n\nx");
    assert!(!merged.sections.contains_key("Empty"));
}

// ── process_text ────────────────────────────────────────────────────

#[tokio::test]
async fn empty_input_gives_empty_report() {
    let chain = MockChain::echo();
    for input in [None, Some(""), Some("  \n")] {
        let report = manager().process_text(input, &chain).await.unwrap();
        assert_eq!(report.final_summary, "");
        assert_eq!(report.metadata.total_chunks, 0);
        assert_eq!(report.metadata.total_tokens, 0);
        assert!(report.chunk_summaries.is_empty());
    }
    assert_eq!(chain.call_count(), 0);
}

#[tokio::test]
async fn summarizes_every_chunk_and_merges() {
    let chain = MockChain::echo();
    let text = "# Features\n## Dark mode\nthemes\n## Sync\nfaster\n# Fixes\ncrash";
    let report = manager().process_text(Some(text), &chain).await.unwrap();

    // "# Features" has no body and is skipped.
    assert_eq!(chain.call_count(), 3);
    assert_eq!(report.metadata.total_chunks, 4);
    assert_eq!(report.metadata.sections, vec!["Features", "Fixes"]);
    assert_eq!(
        report.final_summary,
        "# Features\n\nsummary: themes\n\nsummary: faster\n\n# Fixes\n\nsummary: crash"
    );
    let indices: Vec<usize> = report.chunk_summaries.iter().map(|c| c.metadata.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(!report.metadata.halted);
}

#[tokio::test]
async fn failing_chunk_becomes_marker() {
    let chain = MockChain::new(|_| Err(LlmError::ApiError { status: 500, body: "down".into() }));
    let report = manager().process_text(Some("# Only\nboom"), &chain).await.unwrap();

    assert!(report.final_summary.contains("[Error processing chunk 0: "));
    assert_eq!(report.metadata.failed_chunks, vec![0]);
    assert!(report.chunk_summaries[0].failed);
    assert!(!report.metadata.halted);
}

#[tokio::test]
async fn one_failure_does_not_stop_the_batch() {
    let chain = MockChain::new(|content| {
        if content.contains("bad") {
            Err(LlmError::ParseError("garbled".into()))
        } else {
            Ok("fine".into())
        }
    });
    let text = "# A\ngood\n# B\nbad\n# C\ngood";
    let report = manager().process_text(Some(text), &chain).await.unwrap();

    assert_eq!(chain.call_count(), 3);
    assert_eq!(report.metadata.failed_chunks, vec![1]);
    assert!(report.final_summary.contains("[Error processing chunk 1: failed to parse response: garbled]"));
    assert_eq!(report.final_summary.matches("fine").count(), 2);
}

#[tokio::test]
async fn daily_limit_halts_dispatch_with_note() {
    let chain = MockChain::echo();
    let mgr = manager_with(ManagerOptions::default(), limiter(1));
    let report = mgr.process_text(Some("# A\na\n# B\nb\n# C\nc"), &chain).await.unwrap();

    assert_eq!(chain.call_count(), 1);
    assert!(report.metadata.halted);
    assert!(report.final_summary.starts_with("# A\n\nsummary: a"));
    assert!(report
        .final_summary
        .ends_with("[Rate limit exceeded: 2 of 3 chunks were not processed]"));
}

#[tokio::test]
async fn provider_429_halts_after_current_batch() {
    let chain = MockChain::new(|content| {
        if content.contains("b") {
            Err(LlmError::ApiError { status: 429, body: "quota".into() })
        } else {
            Ok("ok".into())
        }
    });
    let report = manager().process_text(Some("# A\na\n# B\nb\n# C\nc"), &chain).await.unwrap();

    // Batch [A, B] runs; C is never dispatched.
    assert_eq!(chain.call_count(), 2);
    assert!(report.metadata.halted);
    assert_eq!(report.metadata.failed_chunks, vec![1]);
    assert!(report.final_summary.contains("1 of 3 chunks were not processed"));
}

#[tokio::test]
async fn slow_chunk_times_out() {
    let options = ManagerOptions { chunk_timeout: Duration::from_secs(1), ..Default::default() };
    let report = manager_with(options, limiter(10))
        .process_text(Some("# A\nslow"), &SlowChain)
        .await
        .unwrap();
    assert!(report
        .final_summary
        .contains("[Error processing chunk 0: request timed out after 1s]"));
    assert_eq!(report.metadata.failed_chunks, vec![0]);
}

#[tokio::test]
async fn reduce_replaces_merged_text() {
    let reducer = Arc::new(MockChain::new(|merged| Ok(format!("REDUCED({})", merged.len()))));
    let options = ManagerOptions { reduce_enabled: true, ..Default::default() };
    let mgr = manager_with(options, limiter(10)).with_reducer(reducer.clone());

    let report = mgr.process_text(Some("# A\na\n# B\nb"), &MockChain::echo()).await.unwrap();
    assert!(report.final_summary.starts_with("REDUCED("));
    assert_eq!(reducer.call_count(), 1);
    assert!(report.metadata.reduce_enabled);
    assert_eq!(report.section_summaries["A"], "summary: a");
}

#[tokio::test]
async fn reduce_failure_keeps_merge_under_marker() {
    let reducer = Arc::new(MockChain::new(|_| Err(LlmError::Timeout(30))));
    let options = ManagerOptions { reduce_enabled: true, ..Default::default() };
    let mgr = manager_with(options, limiter(10)).with_reducer(reducer);

    let report = mgr.process_text(Some("# A\na"), &MockChain::echo()).await.unwrap();
    assert_eq!(
        report.final_summary,
        "[Error merging chunk summaries: request timed out after 30s]\n\n# A\n\nsummary: a"
    );
    assert_eq!(report.chunk_summaries.len(), 1);
}
