//! Reassembly of chunk summaries into one document.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::types::ProcessedChunk;
use crate::splitter::GENERAL_SECTION;

/// Boilerplate lead-ins models tend to repeat at the top of every partial
/// summary.
pub const INTRO_PATTERNS: &[&str] = &[
    "This document summarizes the user-facing changes included in this software release",
    "This document details the user-facing changes included in",
    "Release Notes",
    "Release Documentation",
    "This document summarizes the",
];

/// Keep the first line mentioning each boilerplate phrase; drop every later
/// line that mentions a phrase already seen. Matching is a case-insensitive
/// substring test and the whole line goes, including any unique text on it.
pub fn remove_duplicate_intros(text: &str) -> String {
    let patterns: Vec<String> = INTRO_PATTERNS.iter().map(|p| p.to_lowercase()).collect();
    let mut seen: HashSet<usize> = HashSet::new();
    let mut kept = Vec::new();

    for line in text.lines() {
        let lower = line.to_lowercase();
        let mut drop = false;
        for (i, pattern) in patterns.iter().enumerate() {
            if !lower.contains(pattern.as_str()) {
                continue;
            }
            if !seen.insert(i) {
                drop = true;
                break;
            }
        }
        if !drop {
            kept.push(line);
        }
    }
    kept.join("\n")
}

/// Merged document plus the per-section texts it was built from.
#[derive(Debug, Clone, Default)]
pub struct MergedSummary {
    pub text: String,
    pub sections: IndexMap<String, String>,
}

/// Group summaries by semantic section (first appearance in document order),
/// order each group by importance, dedup within the section, add a `# Section`
/// heading for everything but the general group, then dedup once more across
/// the whole text.
pub fn merge_summaries(processed: &[ProcessedChunk]) -> MergedSummary {
    let mut by_index: Vec<&ProcessedChunk> = processed.iter().collect();
    by_index.sort_by_key(|p| p.metadata.chunk_index);

    let mut groups: IndexMap<String, Vec<&ProcessedChunk>> = IndexMap::new();
    for p in by_index {
        let key = if p.metadata.semantic_section.is_empty() {
            GENERAL_SECTION.to_string()
        } else {
            p.metadata.semantic_section.clone()
        };
        groups.entry(key).or_default().push(p);
    }

    let mut sections = IndexMap::new();
    let mut blocks = Vec::new();
    for (section, mut members) in groups {
        // Stable sort keeps index order among equal scores.
        members.sort_by(|a, b| {
            b.priority
                .importance
                .partial_cmp(&a.priority.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let joined = members
            .iter()
            .map(|p| p.summary.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let cleaned = remove_duplicate_intros(&joined).trim().to_string();
        if cleaned.is_empty() {
            continue;
        }

        if section == GENERAL_SECTION {
            blocks.push(cleaned.clone());
        } else {
            blocks.push(format!("# {section}\n\n{cleaned}"));
        }
        sections.insert(section, cleaned);
    }

    let text = remove_duplicate_intros(&blocks.join("\n\n")).trim().to_string();
    MergedSummary { text, sections }
}
