//! Feed parsing and normalization.
//!
//! RSS 2.0 and Atom documents are read with two deliberately lenient
//! grammars built on pattern matching rather than a strict XML parser, so
//! mildly malformed real-world feeds still yield items.

pub mod date;
pub mod extract;

mod atom;
mod rss;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{Failure, FeedItem, FeedMetadata};

pub use date::normalize_date;

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

static RSS_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<rss[\s>]").expect("rss tag pattern is valid"));

static ATOM_FEED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<feed\s[^>]*xmlns(?::[\w.-]+)?\s*=\s*["']http://www\.w3\.org/2005/Atom["']"#)
        .expect("atom feed tag pattern is valid")
});

static FEED_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<feed[\s>]").expect("feed tag pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

/// A successfully parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFeed {
    pub feed: FeedMetadata,
    pub items: Vec<FeedItem>,
}

pub type ParseResult = std::result::Result<ParsedFeed, Failure>;

/// Classify a document as RSS or Atom.
///
/// Atom is recognised by a `<feed>` tag declaring the Atom namespace, or
/// failing that by any `<feed>` tag in a document that mentions the
/// namespace URI somewhere.
pub fn detect_format(document: &str) -> Option<FeedFormat> {
    if RSS_TAG.is_match(document) {
        return Some(FeedFormat::Rss);
    }
    if ATOM_FEED_TAG.is_match(document)
        || (FEED_TAG.is_match(document) && document.contains(ATOM_NAMESPACE))
    {
        return Some(FeedFormat::Atom);
    }
    None
}

/// Parse raw RSS or Atom text into feed metadata and items.
///
/// Items lacking a title or link are dropped; unparsable dates become absent.
pub fn parse_feed(document: &str) -> ParseResult {
    if document.trim().is_empty() {
        return Err(Failure::parse_error("Empty feed content"));
    }
    if !document.contains('<') || !document.contains('>') {
        return Err(Failure::parse_error("Invalid XML: no markup found"));
    }

    match detect_format(document) {
        Some(FeedFormat::Rss) => rss::parse_rss(document),
        Some(FeedFormat::Atom) => atom::parse_atom(document),
        None => Err(Failure::parse_error(
            "Unknown feed format: expected RSS or Atom",
        )),
    }
}
