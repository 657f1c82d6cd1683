//! Markdown header scanning.

/// Deepest header level that starts a new section.
pub(crate) const MAX_SPLIT_LEVEL: u8 = 4;

/// A header-delimited section before any budget-driven subdivision.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Section {
    pub level: u8,
    pub title: String,
    pub parent: Option<String>,
    pub semantic_section: String,
    pub body: String,
}

/// Parse an ATX header of level 1-4: `#`..`####` followed by whitespace or
/// end of line. Deeper headers are ordinary content.
pub(crate) fn parse_header(line: &str) -> Option<(u8, String)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > MAX_SPLIT_LEVEL as usize {
        return None;
    }
    let rest = &line[hashes..];
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t')) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    Some((hashes as u8, title.to_string()))
}

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

/// Drop leading and trailing blank lines, keep everything in between.
fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

/// Split markdown into header-delimited sections in document order.
///
/// Text before the first header becomes a level-0 section with no title and
/// is kept only when it is not blank. Lines inside fenced code blocks are
/// never treated as headers.
pub(crate) fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    // Open headers, outermost first.
    let mut stack: Vec<(u8, String)> = Vec::new();
    let mut current = Section {
        level: 0,
        title: String::new(),
        parent: None,
        semantic_section: String::new(),
        body: String::new(),
    };
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            body.push(line);
            continue;
        }
        let header = if in_fence { None } else { parse_header(line) };
        let Some((level, title)) = header else {
            body.push(line);
            continue;
        };

        current.body = trim_blank_lines(&body);
        body.clear();
        if current.level > 0 || !current.body.is_empty() {
            sections.push(current);
        }

        while stack.last().is_some_and(|(l, _)| *l >= level) {
            stack.pop();
        }
        let parent = stack.last().map(|(_, t)| t.clone());
        let semantic_section = if level == 1 {
            title.clone()
        } else {
            stack
                .iter()
                .find(|(l, _)| *l == 1)
                .map(|(_, t)| t.clone())
                .unwrap_or_default()
        };
        stack.push((level, title.clone()));

        current = Section {
            level,
            title,
            parent,
            semantic_section,
            body: String::new(),
        };
    }

    current.body = trim_blank_lines(&body);
    if current.level > 0 || !current.body.is_empty() {
        sections.push(current);
    }
    sections
}
