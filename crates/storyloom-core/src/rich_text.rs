//! Dialogue text with inline `**bold**` emphasis. Nothing else is markup.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Raw dialogue text as authored, markers included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(String);

/// A run of text sharing one emphasis style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSpan {
    /// The visible text.
    pub text: String,
    /// Whether the run was wrapped in `**`.
    pub bold: bool,
}

impl RichText {
    /// Wraps authored text.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the authored text, markers included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the text into runs of plain and bold text. Adjacent runs with
    /// the same style are merged. Only `**` pairs on one line are markup;
    /// every other character, line break and space is kept as written.
    #[must_use]
    pub fn spans(&self) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        for (index, line) in self.0.split('\n').enumerate() {
            if index > 0 {
                push_run(&mut spans, "\n", false);
            }
            let body = line.trim();
            let start = line.len() - line.trim_start().len();
            push_run(&mut spans, &line[..start], false);
            if !body.is_empty() {
                push_line(&mut spans, body);
            }
            push_run(&mut spans, &line[start + body.len()..], false);
        }
        spans
    }

    /// Returns the visible text with markers stripped.
    #[must_use]
    pub fn plain(&self) -> String {
        self.spans().into_iter().map(|span| span.text).collect()
    }
}

impl From<&str> for RichText {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for RichText {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

fn push_line(spans: &mut Vec<TextSpan>, line: &str) {
    let source = escape_markup(line);
    let mut strong_depth = 0usize;
    for event in Parser::new(&source) {
        match event {
            Event::Start(Tag::Strong) => strong_depth += 1,
            Event::End(TagEnd::Strong) => strong_depth = strong_depth.saturating_sub(1),
            Event::Text(text) => push_run(spans, &text, strong_depth > 0),
            _ => {}
        }
    }
}

/// Backslash-escapes every ASCII punctuation character outside the paired
/// `**` markers, so the parser sees bold and nothing else.
fn escape_markup(line: &str) -> String {
    let markers = bold_markers(line);
    let mut escaped = String::with_capacity(line.len() * 2);
    let mut chars = line.char_indices();
    while let Some((at, c)) = chars.next() {
        if markers.contains(&at) {
            escaped.push_str("**");
            chars.next();
            continue;
        }
        if c.is_ascii_punctuation() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Byte offsets of the `**` markers that pair up, left to right. A last
/// unmatched marker and empty pairs are left out.
fn bold_markers(line: &str) -> Vec<usize> {
    let bytes = line.as_bytes();
    let mut found = Vec::new();
    let mut at = 0;
    while at + 1 < bytes.len() {
        if bytes[at] == b'*' && bytes[at + 1] == b'*' {
            found.push(at);
            at += 2;
        } else {
            at += 1;
        }
    }
    found
        .chunks_exact(2)
        .filter(|pair| pair[1] > pair[0] + 2)
        .flatten()
        .copied()
        .collect()
}

fn push_run(spans: &mut Vec<TextSpan>, text: &str, bold: bool) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.bold == bold => last.text.push_str(text),
        _ => spans.push(TextSpan {
            text: text.to_owned(),
            bold,
        }),
    }
}
