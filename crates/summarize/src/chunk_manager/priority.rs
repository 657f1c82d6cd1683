//! Importance scoring and parent/child dependencies.

use super::types::ChunkPriority;
use crate::splitter::Chunk;

const BASE_IMPORTANCE: f64 = 0.5;
const KEYWORD_BONUS: f64 = 0.1;
const SIGNAL_KEYWORDS: &[&str] = &["new", "feature", "important", "breaking"];

fn level_bonus(level: u8) -> f64 {
    match level {
        1 => 0.3,
        2 => 0.2,
        3 => 0.1,
        _ => 0.0,
    }
}

/// Heuristic rank: shallower headers and signal keywords score higher.
pub fn calculate_importance(chunk: &Chunk) -> f64 {
    let mut score = BASE_IMPORTANCE + level_bonus(chunk.metadata.section_level);
    let content = chunk.content.to_lowercase();
    if SIGNAL_KEYWORDS.iter().any(|k| content.contains(k)) {
        score += KEYWORD_BONUS;
    }
    score.clamp(0.0, 1.0)
}

/// A chunk depends on every chunk whose section title equals its parent
/// section title.
pub fn build_priorities(chunks: &[Chunk]) -> Vec<ChunkPriority> {
    let mut priorities: Vec<ChunkPriority> = chunks
        .iter()
        .map(|c| ChunkPriority {
            importance: calculate_importance(c),
            dependencies: Vec::new(),
            dependents: Vec::new(),
        })
        .collect();

    for (i, chunk) in chunks.iter().enumerate() {
        let Some(parent) = chunk.metadata.parent_section.as_deref() else {
            continue;
        };
        if parent.is_empty() {
            continue;
        }
        for (j, other) in chunks.iter().enumerate() {
            if j != i && other.metadata.section_title == parent {
                priorities[i].dependencies.push(j);
                priorities[j].dependents.push(i);
            }
        }
    }
    priorities
}
