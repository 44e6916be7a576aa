//! Shared utility functions for markdown rendering.

use std::collections::HashMap;
use std::sync::LazyLock;

use pulldown_cmark::HeadingLevel;
use regex::Regex;

use crate::document::Inline;

/// Bare `http(s)://` or `www.` URLs, stopping before trailing punctuation.
static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://|www\.)[^\s<>]*[^\s<>.,:;!?'\x22)\]]").unwrap()
});

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Convert text to a URL-safe slug.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Unique heading id allocation (`intro`, `intro-1`, ...).
#[derive(Debug, Default)]
pub(crate) struct HeadingIds {
    counts: HashMap<String, usize>,
}

impl HeadingIds {
    pub(crate) fn allocate(&mut self, text: &str) -> String {
        let base = match slugify(text) {
            s if s.is_empty() => "section".to_owned(),
            s => s,
        };
        let count = self.counts.entry(base.clone()).or_default();
        let id = match *count {
            0 => base,
            n => format!("{base}-{n}"),
        };
        *count += 1;
        id
    }
}

/// Split text into plain runs and links for bare URLs.
pub(crate) fn autolink(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut last = 0;

    for m in BARE_URL_RE.find_iter(text) {
        if m.start() > last {
            out.push(Inline::Text(text[last..m.start()].to_owned()));
        }
        let url = m.as_str();
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_owned()
        };
        out.push(Inline::Link {
            href,
            title: String::new(),
            content: vec![Inline::Text(url.to_owned())],
        });
        last = m.end();
    }

    if last < text.len() {
        out.push(Inline::Text(text[last..].to_owned()));
    }
    out
}

/// Concatenate the plain text of inline content.
#[must_use]
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain_text(inlines, &mut out);
    out
}

fn push_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Emphasis(c)
            | Inline::Strong(c)
            | Inline::Strikethrough(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c)
            | Inline::Link { content: c, .. } => push_plain_text(c, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Html(_) | Inline::TaskMarker(_) => {}
        }
    }
}
