use crate::domain::{Failure, FeedItem, FeedMetadata};
use crate::normalizer::date::normalize_date;
use crate::normalizer::extract::{attribute, blocks, elements, raw_inner, strip_blocks, tag_text};
use crate::normalizer::{ParseResult, ParsedFeed};

struct Link {
    href: String,
    rel: Option<String>,
}

impl Link {
    /// A link without `rel` is an alternate link.
    fn is_alternate(&self) -> bool {
        self.rel
            .as_deref()
            .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
    }

    fn is_self(&self) -> bool {
        self.rel
            .as_deref()
            .is_some_and(|rel| rel.eq_ignore_ascii_case("self"))
    }
}

fn links(xml: &str) -> Vec<Link> {
    elements(xml, "link")
        .into_iter()
        .filter_map(|element| {
            Some(Link {
                href: attribute(element, "href")?,
                rel: attribute(element, "rel"),
            })
        })
        .collect()
}

/// alternate → self → first link → empty.
fn feed_url(links: &[Link]) -> String {
    links
        .iter()
        .find(|l| l.is_alternate())
        .or_else(|| links.iter().find(|l| l.is_self()))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

/// alternate → first link.
fn entry_url(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.is_alternate())
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}

pub(super) fn parse_atom(document: &str) -> ParseResult {
    let body = raw_inner(document, "feed")
        .ok_or_else(|| Failure::parse_error("Invalid Atom feed: missing feed element"))?;
    let head = strip_blocks(body, "entry");

    let title = tag_text(&head, "title")
        .ok_or_else(|| Failure::parse_error("Invalid Atom feed: missing required title"))?;

    let feed = FeedMetadata {
        title,
        url: feed_url(&links(&head)),
        description: tag_text(&head, "subtitle"),
        last_updated: tag_text(&head, "updated").and_then(|d| normalize_date(&d)),
    };

    let items = blocks(body, "entry")
        .into_iter()
        .filter_map(parse_entry)
        .collect();

    Ok(ParsedFeed { feed, items })
}

fn parse_entry(xml: &str) -> Option<FeedItem> {
    // A <source> carries the originating feed's title and links.
    let xml = strip_blocks(xml, "source");

    let (Some(title), Some(url)) = (tag_text(&xml, "title"), entry_url(&links(&xml))) else {
        tracing::debug!("Dropping Atom entry without title or link");
        return None;
    };

    let categories = elements(&xml, "category")
        .into_iter()
        .filter_map(|element| attribute(element, "term"))
        .collect();

    Some(FeedItem {
        title,
        url,
        published: tag_text(&xml, "published")
            .and_then(|d| normalize_date(&d))
            .or_else(|| tag_text(&xml, "updated").and_then(|d| normalize_date(&d))),
        summary: tag_text(&xml, "summary").or_else(|| tag_text(&xml, "content")),
        author: raw_inner(&xml, "author").and_then(|author| tag_text(author, "name")),
        categories,
    })
}
