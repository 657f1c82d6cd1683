//! Rendering helpers: correlated JSON to markdown, and cleanup of
//! chunk-numbering artifacts in model output.

use serde_json::Value;

/// Render a JSON document as markdown.
///
/// Object keys with nested values become `#`-headings at `level` and recurse
/// one level deeper; scalar fields become `**Key:** value` paragraphs. Arrays
/// render nested items at the same level and scalars as a numbered list.
pub fn json_to_markdown(value: &Value, level: usize) -> String {
    let mut out = String::new();
    render(value, level.max(1), &mut out);
    out
}

fn render(value: &Value, level: usize, out: &mut String) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                if is_nested(v) {
                    out.push_str(&"#".repeat(level));
                    out.push(' ');
                    out.push_str(&capitalize(key));
                    out.push_str("\n\n");
                    render(v, level + 1, out);
                } else {
                    out.push_str(&format!("**{}:** {}\n\n", capitalize(key), scalar(v)));
                }
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                if is_nested(item) {
                    render(item, level, out);
                } else {
                    out.push_str(&format!("{}. {}\n", idx + 1, scalar(item)));
                }
            }
            out.push('\n');
        }
        other => {
            out.push_str(&scalar(other));
            out.push_str("\n\n");
        }
    }
}

fn is_nested(v: &Value) -> bool {
    matches!(v, Value::Object(_) | Value::Array(_))
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Drop `## Part N` lines left over from chunk numbering, and strip a
/// leading `## Part ` marker from any line that still carries one.
pub fn strip_part_markers(text: &str) -> String {
    let mut kept = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("## Part ") {
            let rest = rest.trim();
            let number_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            let tail = rest[number_len..].trim_start_matches(|c: char| c == ':' || c == '.').trim();
            if number_len > 0 && tail.is_empty() {
                continue;
            }
            kept.push(rest.to_string());
            continue;
        }
        kept.push(line.to_string());
    }
    kept.join("\n").trim().to_string()
}
