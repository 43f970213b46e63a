//! Shared building blocks for the tool result extractors.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Compile a pattern once and cache it in a static cell.
///
/// Expands to a `Result<&'static Regex>`; a pattern that fails to compile
/// becomes an [`Error::Extract`] tagged with `$tool`.
macro_rules! pattern {
    ($tool:expr, $src:expr) => {{
        static CELL: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
        $crate::extract::common::compiled(&CELL, $tool, $src)
    }};
}

pub(crate) use pattern;

pub(crate) fn compiled(
    cell: &'static OnceLock<Regex>,
    tool: &str,
    src: &str,
) -> Result<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(src).map_err(|e| Error::Extract {
        tool: tool.to_string(),
        message: format!("bad pattern {:?}: {}", src, e),
    })?;
    // A concurrent caller may have won the race; either value is equivalent.
    let _ = cell.set(re);
    cell.get().ok_or_else(|| Error::Extract {
        tool: tool.to_string(),
        message: "pattern cache unavailable".to_string(),
    })
}

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('\u{201c}', '\u{201d}'),
    ('\u{2018}', '\u{2019}'),
    ('\u{300c}', '\u{300d}'),
    ('\u{300e}', '\u{300f}'),
];

/// Uniform item cleanup: leading `<n>.` marker, matching quotes, whitespace.
pub fn clean_item(raw: &str) -> String {
    let mut s = strip_enumeration(raw.trim()).trim();

    loop {
        let mut chars = s.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            break;
        };
        let paired = QUOTE_PAIRS
            .iter()
            .any(|(open, close)| first == *open && last == *close);
        if !paired {
            break;
        }
        s = s[first.len_utf8()..s.len() - last.len_utf8()].trim();
    }

    s.to_string()
}

/// Strip a leading `12.` (or `12、`) enumeration marker.
fn strip_enumeration(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return s;
    }
    let rest = &s[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix('、'))
        .or_else(|| rest.strip_prefix('．'))
        .unwrap_or(s)
}

/// Body of the first section whose heading line matches `heading`.
///
/// The body runs from the line after the heading to the next `##`/`###`
/// heading (deeper headings stay inside) or a `---` rule.
pub fn section_body<'a>(text: &'a str, heading: &Regex) -> Option<&'a str> {
    let found = heading.find(text)?;
    let rest = &text[found.end()..];
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => "",
    };
    Some(&body[..block_end(body)])
}

/// Offset of the first line in `body` that ends the current section
pub fn block_end(body: &str) -> usize {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed.starts_with("## ") || trimmed.starts_with("### ") || trimmed == "---" {
            return offset;
        }
        offset += line.len();
    }
    body.len()
}

/// First capture group of `re` in `text`, trimmed; empty when absent.
pub fn capture_str(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// First capture group of `re` parsed as a count; 0 when absent.
pub fn capture_count(re: &Regex, text: &str) -> u32 {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().trim().parse().ok())
        .unwrap_or(0)
}

/// Numbered lines (`1. ...`) of a block, cleaned, at most `cap`.
pub fn numbered_items(block: &str, cap: usize) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| {
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            digits > 0 && strip_enumeration(line).len() < line.len()
        })
        .map(clean_item)
        .filter(|item| !item.is_empty())
        .take(cap)
        .collect()
}
