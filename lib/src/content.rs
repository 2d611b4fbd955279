//! Rich text post content.
//!
//! Post bodies are stored as the JSON document produced by the editor: a tree
//! of nodes where leaf `text` nodes carry the actual words. The backend never
//! interprets formatting, it only needs the plain text for reading time
//! estimates and search.

use serde_json::{json, Value};

/// Collects the text of all text nodes, separated by single spaces.
pub fn plain_text(doc: &Value) -> String {
    let mut out = Vec::new();
    collect_text(doc, &mut out);
    out.join(" ")
}

fn collect_text<'a>(node: &'a Value, out: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push(text);
            }
            if let Some(children) = map.get("content") {
                collect_text(children, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        // bare strings are accepted for documents created outside the editor
        Value::String(text) => out.push(text),
        _ => (),
    }
}

pub fn word_count(doc: &Value) -> usize {
    plain_text(doc).split_whitespace().count()
}

/// Estimated reading time in whole minutes, never less than one.
pub fn reading_time(doc: &Value, words_per_minute: usize) -> u32 {
    let wpm = words_per_minute.max(1);
    let words = word_count(doc);
    (words.div_ceil(wpm)).max(1) as u32
}

/// Builds an editor document out of plain text, one paragraph per block
/// separated by blank lines.
pub fn from_paragraphs(text: &str) -> Value {
    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": p }]
            })
        })
        .collect::<Vec<_>>();
    json!({ "type": "doc", "content": paragraphs })
}
