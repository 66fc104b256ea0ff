//! Entity extraction.
//!
//! Turns the hashtag, url, mention and media entity groups of a tweet into
//! [`Span`]s: a codepoint range of the tweet text plus the anchor markup that
//! replaces it. Spans are keyed by their start offset.
//!
//! Groups are processed in the order hashtags, urls, user mentions, media.
//! Within a group a later entity replaces an earlier one with the same start
//! offset; across groups the first group to claim an offset keeps it.

use crate::error::TapiError;
use crate::model::{Entities, HashtagEntity, MediaEntity, MentionEntity, RawTweet, UrlEntity};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Default site that hashtag and mention links point at.
pub const DEFAULT_BASE_URL: &str = "https://twitter.com";

/// Spans keyed by start offset (in codepoints).
pub type SpanMap = BTreeMap<usize, Span>;

/// A replacement over `[start, start + length)` of the tweet text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub length: usize,
    pub replacement: String,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, length: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            length,
            replacement: replacement.into(),
        }
    }

    /// Exclusive end offset.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

/// The four entity kinds a tweet can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Hashtag,
    Url,
    Mention,
    Media,
}

impl EntityKind {
    /// Processing order of the groups.
    pub const ALL: [Self; 4] = [Self::Hashtag, Self::Url, Self::Mention, Self::Media];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hashtag => "hashtag",
            Self::Url => "url",
            Self::Mention => "mention",
            Self::Media => "media",
        }
    }

    fn group(self, entities: &Entities) -> &[Value] {
        let group = match self {
            Self::Hashtag => &entities.hashtags,
            Self::Url => &entities.urls,
            Self::Mention => &entities.user_mentions,
            Self::Media => &entities.media,
        };
        group.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options controlling the generated anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Site for hashtag searches and profile links, without trailing slash.
    pub base_url: String,
    /// Add `target="_blank"`.
    pub new_tab: bool,
    /// Add `rel="nofollow"`.
    pub nofollow: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            new_tab: true,
            nofollow: true,
        }
    }
}

impl RenderOptions {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Build an anchor. `href` is checked and escaped here, `title` and
    /// `body` must be plain text.
    #[must_use]
    pub fn anchor(&self, href: &str, title: Option<&str>, body: &str) -> String {
        let mut out = format!("<a href=\"{}\"", escape_attr(&safe_href(href)));
        if self.nofollow {
            out.push_str(" rel=\"nofollow\"");
        }
        if self.new_tab {
            out.push_str(" target=\"_blank\"");
        }
        if let Some(title) = title {
            out.push_str(" title=\"");
            out.push_str(&escape_attr(title));
            out.push('"');
        }
        out.push('>');
        out.push_str(&escape_html(body));
        out.push_str("</a>");
        out
    }
}

/// Escape text for an HTML text node.
#[must_use]
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Escape text for a double-quoted HTML attribute.
#[must_use]
pub fn escape_attr(s: &str) -> String {
    escape_html(s)
}

/// Only `http` and `https` links survive; anything else becomes `#`.
fn safe_href(href: &str) -> String {
    let lower = href.trim_start().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        href.trim().to_string()
    } else {
        "#".to_string()
    }
}

/// An entity record that knows its range and its markup.
trait Annotation: DeserializeOwned {
    const KIND: EntityKind;

    fn indices(&self) -> [usize; 2];

    fn markup(&self, options: &RenderOptions) -> String;
}

impl Annotation for HashtagEntity {
    const KIND: EntityKind = EntityKind::Hashtag;

    fn indices(&self) -> [usize; 2] {
        self.indices
    }

    fn markup(&self, options: &RenderOptions) -> String {
        let href = format!(
            "{}/search?q=%23{}&src=hash",
            options.base(),
            urlencoding::encode(&self.text.to_lowercase())
        );
        options.anchor(&href, None, &format!("#{}", self.text))
    }
}

impl Annotation for UrlEntity {
    const KIND: EntityKind = EntityKind::Url;

    fn indices(&self) -> [usize; 2] {
        self.indices
    }

    fn markup(&self, options: &RenderOptions) -> String {
        link_markup(
            &self.url,
            self.expanded_url.as_deref(),
            self.display_url.as_deref(),
            options,
        )
    }
}

impl Annotation for MentionEntity {
    const KIND: EntityKind = EntityKind::Mention;

    fn indices(&self) -> [usize; 2] {
        self.indices
    }

    fn markup(&self, options: &RenderOptions) -> String {
        let href = format!(
            "{}/{}",
            options.base(),
            urlencoding::encode(&self.screen_name.to_lowercase())
        );
        let title = self.name.as_deref().unwrap_or(&self.screen_name);
        options.anchor(&href, Some(title), &format!("@{}", self.screen_name))
    }
}

impl Annotation for MediaEntity {
    const KIND: EntityKind = EntityKind::Media;

    fn indices(&self) -> [usize; 2] {
        self.indices
    }

    fn markup(&self, options: &RenderOptions) -> String {
        link_markup(
            &self.url,
            self.expanded_url.as_deref(),
            self.display_url.as_deref(),
            options,
        )
    }
}

fn link_markup(
    url: &str,
    expanded: Option<&str>,
    display: Option<&str>,
    options: &RenderOptions,
) -> String {
    let title = expanded.unwrap_or(url);
    let body = display.unwrap_or(url);
    options.anchor(url, Some(title), body)
}

/// Extract the spans of every entity group on `tweet`, validated against
/// the text the tweet renders.
#[must_use]
pub fn extract_spans(tweet: &RawTweet, options: &RenderOptions) -> SpanMap {
    let Some(entities) = tweet.entities.as_ref() else {
        return SpanMap::new();
    };
    let char_len = tweet.display_text().chars().count();
    extract_entity_spans(entities, char_len, options)
}

/// Extract spans from entity groups for a text of `char_len` codepoints.
#[must_use]
pub fn extract_entity_spans(entities: &Entities, char_len: usize, options: &RenderOptions) -> SpanMap {
    let mut spans = SpanMap::new();
    for kind in EntityKind::ALL {
        let group = kind.group(entities);
        if group.is_empty() {
            continue;
        }
        let parsed = match kind {
            EntityKind::Hashtag => parse_group::<HashtagEntity>(group, char_len, options),
            EntityKind::Url => parse_group::<UrlEntity>(group, char_len, options),
            EntityKind::Mention => parse_group::<MentionEntity>(group, char_len, options),
            EntityKind::Media => parse_group::<MediaEntity>(group, char_len, options),
        };
        for (start, span) in parsed {
            spans.entry(start).or_insert(span);
        }
    }
    debug!(spans = spans.len(), "Extracted entity spans");
    spans
}

fn parse_group<T: Annotation>(
    group: &[Value],
    char_len: usize,
    options: &RenderOptions,
) -> SpanMap {
    let mut spans = SpanMap::new();
    for value in group {
        match to_span::<T>(value, char_len, options) {
            Ok(span) => {
                spans.insert(span.start, span);
            }
            Err(err) => warn!(error = %err, "Skipping entity"),
        }
    }
    spans
}

fn to_span<T: Annotation>(
    value: &Value,
    char_len: usize,
    options: &RenderOptions,
) -> Result<Span, TapiError> {
    let entity = T::deserialize(value)
        .map_err(|e| TapiError::malformed_entity(T::KIND.as_str(), e.to_string()))?;
    let [start, end] = entity.indices();
    if end < start {
        return Err(TapiError::malformed_entity(
            T::KIND.as_str(),
            format!("indices [{start}, {end}] are reversed"),
        ));
    }
    if start > char_len {
        return Err(TapiError::malformed_entity(
            T::KIND.as_str(),
            format!("start {start} is past the end of the text ({char_len})"),
        ));
    }
    // Trailing overruns are common in upstream data; cut them at the end.
    let end = end.min(char_len);
    Ok(Span::new(start, end - start, entity.markup(options)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tweet(value: Value) -> RawTweet {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn hashtag_markup_links_lowercase_search() {
        let raw = tweet(json!({
            "text": "Go #WordPress",
            "entities": {"hashtags": [{"text": "WordPress", "indices": [3, 13]}]}
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        let span = &spans[&3];
        assert_eq!(span.length, 10);
        assert_eq!(
            span.replacement,
            "<a href=\"https://twitter.com/search?q=%23wordpress&amp;src=hash\" \
             rel=\"nofollow\" target=\"_blank\">#WordPress</a>"
        );
    }

    #[test]
    fn url_markup_uses_short_expanded_and_display() {
        let raw = tweet(json!({
            "text": "see http://t.co/x",
            "entities": {"urls": [{
                "url": "http://t.co/x",
                "expanded_url": "http://wp.org/?a=1&b=2",
                "display_url": "wp.org/?a=1&b=2",
                "indices": [4, 17]
            }]}
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert_eq!(
            spans[&4].replacement,
            "<a href=\"http://t.co/x\" rel=\"nofollow\" target=\"_blank\" \
             title=\"http://wp.org/?a=1&amp;b=2\">wp.org/?a=1&amp;b=2</a>"
        );
    }

    #[test]
    fn mention_markup_lowercases_href_only() {
        let raw = tweet(json!({
            "text": "hi @WordPress",
            "entities": {"user_mentions": [{
                "screen_name": "WordPress",
                "name": "WordPress <3",
                "indices": [3, 13]
            }]}
        }));
        let options = RenderOptions {
            new_tab: false,
            nofollow: false,
            ..RenderOptions::default()
        };
        let spans = extract_spans(&raw, &options);
        assert_eq!(
            spans[&3].replacement,
            "<a href=\"https://twitter.com/wordpress\" title=\"WordPress &lt;3\">@WordPress</a>"
        );
    }

    #[test]
    fn media_markup_matches_url_shape() {
        let raw = tweet(json!({
            "text": "pic https://t.co/m",
            "entities": {"media": [{
                "url": "https://t.co/m",
                "expanded_url": "https://twitter.com/wp/status/1/photo/1",
                "display_url": "pic.twitter.com/m",
                "media_url_https": "https://pbs.twimg.com/media/m.jpg",
                "type": "photo",
                "indices": [4, 18]
            }]}
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert!(spans[&4].replacement.starts_with("<a href=\"https://t.co/m\""));
        assert!(spans[&4].replacement.ends_with(">pic.twitter.com/m</a>"));
    }

    #[test]
    fn absent_and_empty_groups_yield_no_spans() {
        let raw = tweet(json!({"text": "plain"}));
        assert!(extract_spans(&raw, &RenderOptions::default()).is_empty());

        let raw = tweet(json!({
            "text": "plain",
            "entities": {"hashtags": [], "urls": null, "user_mentions": []}
        }));
        assert!(extract_spans(&raw, &RenderOptions::default()).is_empty());
    }

    #[test]
    fn malformed_entities_are_skipped_individually() {
        let raw = tweet(json!({
            "text": "#a #b #c #d",
            "entities": {"hashtags": [
                {"text": "a", "indices": [0, 2]},
                {"text": "b"},
                {"text": "c", "indices": [8, 6]},
                {"text": "d", "indices": [20, 22]},
                {"indices": [3, 5]}
            ]}
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert_eq!(spans.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn duplicate_start_last_write_wins_within_group() {
        let raw = tweet(json!({
            "text": "#one",
            "entities": {"hashtags": [
                {"text": "one", "indices": [0, 4]},
                {"text": "two", "indices": [0, 4]}
            ]}
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert_eq!(spans.len(), 1);
        assert!(spans[&0].replacement.contains("#two"));
    }

    #[test]
    fn duplicate_start_first_group_wins_across_groups() {
        let raw = tweet(json!({
            "text": "#tag",
            "entities": {
                "hashtags": [{"text": "tag", "indices": [0, 4]}],
                "urls": [{"url": "http://t.co/z", "indices": [0, 4]}]
            }
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert!(spans[&0].replacement.contains("#tag"));
    }

    #[test]
    fn non_http_hrefs_are_neutralised() {
        let options = RenderOptions::default();
        let html = options.anchor("javascript:alert(1)", None, "x");
        assert!(html.starts_with("<a href=\"#\""));
    }

    #[test]
    fn indices_validated_in_codepoints() {
        let raw = tweet(json!({
            "text": "héllo #wp",
            "entities": {"hashtags": [{"text": "wp", "indices": [6, 9]}]}
        }));
        assert_eq!(raw.display_text().len(), 10);
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert_eq!(spans[&6].end(), 9);
    }

    #[test]
    fn trailing_overrun_is_clamped() {
        let raw = tweet(json!({
            "text": "go #wp",
            "entities": {"hashtags": [{"text": "wp", "indices": [3, 7]}]}
        }));
        let spans = extract_spans(&raw, &RenderOptions::default());
        assert_eq!(spans[&3].length, 3);
    }
}
