use crate::domain::{Failure, FeedItem, FeedMetadata};
use crate::normalizer::date::normalize_date;
use crate::normalizer::extract::{all_tag_text, blocks, raw_inner, strip_blocks, tag_text};
use crate::normalizer::{ParseResult, ParsedFeed};

/// Channel children whose own `<title>`/`<link>` must not be read as the
/// channel's.
const NESTED_BLOCKS: &[&str] = &["item", "image", "textinput"];

pub(super) fn parse_rss(document: &str) -> ParseResult {
    let channel = raw_inner(document, "channel")
        .ok_or_else(|| Failure::parse_error("Invalid RSS feed: missing channel element"))?;

    let mut head = channel.to_string();
    for tag in NESTED_BLOCKS {
        head = strip_blocks(&head, tag);
    }

    let (Some(title), Some(link)) = (tag_text(&head, "title"), tag_text(&head, "link")) else {
        return Err(Failure::parse_error(
            "Invalid RSS feed: missing required title or link",
        ));
    };

    let feed = FeedMetadata {
        title,
        url: link,
        description: tag_text(&head, "description"),
        last_updated: tag_text(&head, "lastBuildDate")
            .and_then(|d| normalize_date(&d))
            .or_else(|| tag_text(&head, "pubDate").and_then(|d| normalize_date(&d))),
    };

    let items = blocks(channel, "item")
        .into_iter()
        .filter_map(parse_item)
        .collect();

    Ok(ParsedFeed { feed, items })
}

fn parse_item(xml: &str) -> Option<FeedItem> {
    let (Some(title), Some(url)) = (tag_text(xml, "title"), tag_text(xml, "link")) else {
        tracing::debug!("Dropping RSS item without title or link");
        return None;
    };

    Some(FeedItem {
        title,
        url,
        published: tag_text(xml, "pubDate")
            .and_then(|d| normalize_date(&d))
            .or_else(|| tag_text(xml, "dc:date").and_then(|d| normalize_date(&d))),
        summary: tag_text(xml, "description").or_else(|| tag_text(xml, "content:encoded")),
        author: tag_text(xml, "author").or_else(|| tag_text(xml, "dc:creator")),
        categories: all_tag_text(xml, "category"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_title_not_mistaken_for_channel() {
        let xml = r#"<rss version="2.0"><channel>
  <image><title>Logo</title><link>https://example.com/logo</link><url>https://example.com/logo.png</url></image>
  <title>Real Title</title>
  <link>https://example.com/</link>
</channel></rss>"#;
        let parsed = parse_rss(xml).unwrap();
        assert_eq!(parsed.feed.title, "Real Title");
        assert_eq!(parsed.feed.url, "https://example.com/");
    }

    #[test]
    fn test_missing_channel() {
        let failure = parse_rss(r#"<rss version="2.0"></rss>"#).unwrap_err();
        assert!(failure.message.contains("channel"));
    }

    #[test]
    fn test_dublin_core_fallbacks() {
        let xml = r#"<rss version="2.0"><channel>
  <title>T</title><link>https://example.com/</link>
  <item>
    <title>A</title>
    <link>https://example.com/a</link>
    <dc:creator>Jane Doe</dc:creator>
    <dc:date>2024-05-01T12:00:00Z</dc:date>
    <content:encoded><![CDATA[<p>Body</p>]]></content:encoded>
  </item>
</channel></rss>"#;
        let parsed = parse_rss(xml).unwrap();
        let item = &parsed.items[0];
        assert_eq!(item.author.as_deref(), Some("Jane Doe"));
        assert_eq!(item.summary.as_deref(), Some("<p>Body</p>"));
        assert_eq!(
            item.published.map(|d| d.to_rfc3339()),
            Some("2024-05-01T12:00:00+00:00".into())
        );
    }

    #[test]
    fn test_channel_pub_date_fallback() {
        let xml = r#"<rss><channel><title>T</title><link>https://example.com/</link>
  <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate></channel></rss>"#;
        let parsed = parse_rss(xml).unwrap();
        assert!(parsed.feed.last_updated.is_some());
    }
}
