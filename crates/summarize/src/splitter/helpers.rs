//! Text splitting utilities used when a section exceeds its budget.

/// Non-blank `\n\n`-separated blocks.
pub(crate) fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// Split at `". "`; the period stays with its sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The last `overlap_words` words of `text`.
pub(crate) fn overlap_tail(text: &str, overlap_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= overlap_words {
        return words.join(" ");
    }
    words[words.len() - overlap_words..].join(" ")
}
