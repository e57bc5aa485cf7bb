//! Lenient tag and attribute extraction.
//!
//! These are pattern matchers, not an XML parser: tag names match
//! case-insensitively, opening tags may carry attributes, and `CDATA`
//! sections are taken literally even when they contain markup.

use std::collections::HashMap;
use std::sync::Mutex;

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

static CDATA_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("CDATA pattern is valid"));

/// Compiled per-tag patterns, keyed by pattern source. Tag and attribute
/// names come from a small fixed set, so this stays bounded.
static PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn compiled(pattern: String) -> Option<Regex> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(re) = patterns.get(&pattern) {
        return Some(re.clone());
    }
    let re = Regex::new(&pattern).ok()?;
    patterns.insert(pattern, re.clone());
    Some(re)
}

/// Pattern for a complete `<tag ...>inner</tag>` block, inner text in group 1.
///
/// Self-closing tags never open a block. CDATA sections are skipped as a
/// unit so a closing tag inside one does not end the block.
fn block_regex(tag: &str) -> Option<Regex> {
    let tag = regex::escape(tag);
    compiled(format!(
        r"(?is)<{tag}(?:\s[^>]*[^/>])?\s*>((?:<!\[CDATA\[.*?\]\]>|.)*?)</{tag}\s*>"
    ))
}

/// Pattern for an opening or self-closing `<tag ...>` element.
fn element_regex(tag: &str) -> Option<Regex> {
    let tag = regex::escape(tag);
    compiled(format!(r"(?is)<{tag}(?:\s[^>]*)?/?>"))
}

fn attribute_regex(name: &str) -> Option<Regex> {
    let name = regex::escape(name);
    compiled(format!(
        r#"(?is)(?:^|\s){name}\s*=\s*(?:"([^"]*)"|'([^']*)')"#
    ))
}

/// Raw inner markup of the first `tag` block.
pub fn raw_inner<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let re = block_regex(tag)?;
    re.captures(xml)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Raw inner markup of every `tag` block, in document order.
pub fn blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let Some(re) = block_regex(tag) else {
        return Vec::new();
    };
    re.captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Copy of `xml` with every `tag` block removed.
pub fn strip_blocks(xml: &str, tag: &str) -> String {
    match block_regex(tag) {
        Some(re) => re.replace_all(xml, "").into_owned(),
        None => xml.to_string(),
    }
}

/// Text of the first `tag` block, or `None` if absent or blank.
pub fn tag_text(xml: &str, tag: &str) -> Option<String> {
    raw_inner(xml, tag).and_then(clean_text)
}

/// Text of every non-blank `tag` block, in document order.
pub fn all_tag_text(xml: &str, tag: &str) -> Vec<String> {
    blocks(xml, tag).into_iter().filter_map(clean_text).collect()
}

/// Every opening or self-closing `tag` element, in document order.
pub fn elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let Some(re) = element_regex(tag) else {
        return Vec::new();
    };
    re.find_iter(xml).map(|m| m.as_str()).collect()
}

/// Value of attribute `name` on a single element, entity-decoded.
pub fn attribute(element: &str, name: &str) -> Option<String> {
    let re = attribute_regex(name)?;
    let caps = re.captures(element)?;
    let value = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let value = decode_html_entities(value.trim());
    if value.is_empty() {
        None
    } else {
        Some(value.into_owned())
    }
}

/// Turn raw inner markup into text: CDATA sections are kept literally, the
/// rest has entities decoded. Surrounding whitespace is trimmed.
fn clean_text(raw: &str) -> Option<String> {
    let mut text = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in CDATA_SECTION.captures_iter(raw) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        text.push_str(&decode_html_entities(&raw[last..whole.start()]));
        text.push_str(inner.as_str());
        last = whole.end();
    }
    text.push_str(&decode_html_entities(&raw[last..]));

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
