//! Structure-preserving markdown splitting.
//!
//! Splits a document at headers (levels 1-4), then subdivides sections that
//! exceed the token budget by paragraph and finally by sentence. Every
//! sub-chunk keeps the metadata of the section it came from so the hierarchy
//! survives for scheduling and merging.

mod headers;
mod helpers;
mod types;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::tokenizer::{TokenCounter, TokenizerError};

use headers::{split_sections, Section};
use helpers::{overlap_tail, split_paragraphs, split_sentences};

pub use types::{Chunk, ChunkMetadata, SplitterConfig, GENERAL_SECTION};

/// A piece of a section body before metadata is attached.
struct Piece {
    text: String,
    oversized: bool,
}

pub struct SemanticSplitter {
    config: SplitterConfig,
    counter: Arc<dyn TokenCounter>,
}

impl SemanticSplitter {
    pub fn new(config: SplitterConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split `text` into chunks in document order.
    pub fn split_text(&self, text: &str) -> Result<Vec<Chunk>, TokenizerError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut chunks = Vec::new();
        for section in split_sections(text) {
            let pieces = self.split_section(&section)?;
            for piece in pieces {
                let token_count = self.counter.count_tokens(&piece.text)?;
                chunks.push(Chunk {
                    content: piece.text,
                    metadata: ChunkMetadata {
                        token_count,
                        chunk_index: 0, // filled below
                        total_chunks: 0,
                        section_title: section.title.clone(),
                        section_level: section.level,
                        parent_section: section.parent.clone(),
                        semantic_section: section.semantic_section.clone(),
                        oversized: piece.oversized,
                    },
                });
            }
        }

        let total = chunks.len();
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.metadata.chunk_index = i;
            chunk.metadata.total_chunks = total;
        }
        debug!(chunks = total, max_tokens = self.config.max_tokens, "split complete");
        Ok(chunks)
    }

    fn split_section(&self, section: &Section) -> Result<Vec<Piece>, TokenizerError> {
        let tokens = self.counter.count_tokens(&section.body)?;
        if tokens <= self.config.max_tokens {
            return Ok(vec![Piece { text: section.body.clone(), oversized: false }]);
        }

        debug!(
            title = %section.title,
            tokens,
            max_tokens = self.config.max_tokens,
            "section over budget, subdividing"
        );
        let pieces = self.subdivide(&section.body)?;
        self.add_overlap(pieces)
    }

    /// Accumulate paragraphs up to the budget. A paragraph that alone is too
    /// large is split by sentence, flushing whatever was accumulated first.
    fn subdivide(&self, body: &str) -> Result<Vec<Piece>, TokenizerError> {
        let max = self.config.max_tokens;
        let mut pieces = Vec::new();
        let mut buf = String::new();

        for para in split_paragraphs(body) {
            if self.counter.count_tokens(para)? > max {
                flush(&mut buf, &mut pieces);
                for sentence in split_sentences(para) {
                    let oversized = self.counter.count_tokens(&sentence)? > max;
                    if oversized {
                        warn!(
                            max_tokens = max,
                            "single sentence exceeds chunk budget, emitting as-is"
                        );
                    }
                    pieces.push(Piece { text: sentence, oversized });
                }
                continue;
            }

            if buf.is_empty() {
                buf.push_str(para);
                continue;
            }
            let candidate = format!("{buf}\n\n{para}");
            if self.counter.count_tokens(&candidate)? > max {
                flush(&mut buf, &mut pieces);
                buf.push_str(para);
            } else {
                buf = candidate;
            }
        }
        flush(&mut buf, &mut pieces);
        Ok(pieces)
    }

    /// Prefix each piece with the tail of its predecessor when it still fits.
    fn add_overlap(&self, pieces: Vec<Piece>) -> Result<Vec<Piece>, TokenizerError> {
        if self.config.overlap_tokens == 0 || pieces.len() < 2 {
            return Ok(pieces);
        }

        let mut out = Vec::with_capacity(pieces.len());
        for i in 0..pieces.len() {
            let piece = &pieces[i];
            if i == 0 || piece.oversized {
                out.push(Piece { text: piece.text.clone(), oversized: piece.oversized });
                continue;
            }
            let tail = overlap_tail(&pieces[i - 1].text, self.config.overlap_tokens);
            let candidate = format!("{tail}\n\n{}", piece.text);
            let text = if self.counter.count_tokens(&candidate)? <= self.config.max_tokens {
                candidate
            } else {
                piece.text.clone()
            };
            out.push(Piece { text, oversized: false });
        }
        Ok(out)
    }
}

fn flush(buf: &mut String, pieces: &mut Vec<Piece>) {
    if !buf.is_empty() {
        pieces.push(Piece { text: std::mem::take(buf), oversized: false });
    }
}
