//! Span resolution.
//!
//! Applies [`Span`]s to tweet text. Spans are spliced rightmost first, so the
//! offsets of spans further left stay valid while the text changes length
//! under them. All offsets are codepoints, never bytes.

use crate::entities::{RenderOptions, Span, SpanMap, extract_spans};
use crate::model::RawTweet;

/// Byte offset of the `char_idx`-th codepoint, clamped to the end.
fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map_or(text.len(), |(byte, _)| byte)
}

/// Replace `length` codepoints starting at codepoint `start`.
///
/// Out-of-range offsets are clamped to the end of `text`.
#[must_use]
pub fn splice(text: &str, start: usize, length: usize, replacement: &str) -> String {
    let head = byte_offset(text, start);
    let tail = head + byte_offset(&text[head..], length);

    let mut out = String::with_capacity(text.len() - (tail - head) + replacement.len());
    out.push_str(&text[..head]);
    out.push_str(replacement);
    out.push_str(&text[tail..]);
    out
}

/// Apply spans in descending start order.
///
/// Spans sharing a start offset keep their input order.
#[must_use]
pub fn apply_spans<'a, I>(text: &str, spans: I) -> String
where
    I: IntoIterator<Item = &'a Span>,
{
    let mut ordered: Vec<&Span> = spans.into_iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    ordered.into_iter().fold(text.to_string(), |acc, span| {
        splice(&acc, span.start, span.length, &span.replacement)
    })
}

/// Render a span map over `text`.
#[must_use]
pub fn render_spans(text: &str, spans: &SpanMap) -> String {
    apply_spans(text, spans.values())
}

/// Render a tweet's display text with all of its entities linked.
///
/// Text outside entities passes through untouched.
#[must_use]
pub fn render_tweet(tweet: &RawTweet, options: &RenderOptions) -> String {
    let spans = extract_spans(tweet, options);
    render_spans(tweet.display_text(), &spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splice_ascii() {
        assert_eq!(splice("hello world", 6, 5, "there"), "hello there");
        assert_eq!(splice("abc", 0, 0, "x"), "xabc");
        assert_eq!(splice("abc", 3, 0, "x"), "abcx");
    }

    #[test]
    fn splice_counts_codepoints() {
        let text = "😀 #rust rocks";
        assert_eq!(splice(text, 2, 5, "[tag]"), "😀 [tag] rocks");

        let combining = "e\u{301} #x";
        assert_eq!(splice(combining, 3, 2, "[x]"), "e\u{301} [x]");
    }

    #[test]
    fn splice_clamps_out_of_range() {
        assert_eq!(splice("abc", 10, 2, "x"), "abcx");
        assert_eq!(splice("abc", 1, 10, "x"), "ax");
    }

    #[test]
    fn apply_spans_right_to_left_keeps_offsets() {
        let spans = vec![
            Span::new(0, 1, "<A>"),
            Span::new(2, 1, "<CC>"),
            Span::new(4, 1, "<EEE>"),
        ];
        assert_eq!(apply_spans("a c e", &spans), "<A> <CC> <EEE>");

        let reversed: Vec<Span> = spans.into_iter().rev().collect();
        assert_eq!(apply_spans("a c e", &reversed), "<A> <CC> <EEE>");
    }

    #[test]
    fn apply_spans_equal_starts_do_not_panic() {
        let spans = vec![Span::new(1, 1, "X"), Span::new(1, 1, "Y")];
        let out = apply_spans("abc", &spans);
        assert_eq!(out, apply_spans("abc", &spans));
        assert!(out.starts_with('a'));
    }

    #[test]
    fn render_tweet_end_to_end() {
        let raw: RawTweet = serde_json::from_value(json!({
            "text": "Check #WP at http://t.co/x",
            "entities": {
                "hashtags": [{"text": "WP", "indices": [6, 9]}],
                "urls": [{
                    "url": "http://t.co/x",
                    "expanded_url": "http://wp.org",
                    "display_url": "wp.org",
                    "indices": [13, 26]
                }]
            }
        }))
        .unwrap();

        let html = render_tweet(&raw, &RenderOptions::default());
        assert_eq!(
            html,
            "Check <a href=\"https://twitter.com/search?q=%23wp&amp;src=hash\" \
             rel=\"nofollow\" target=\"_blank\">#WP</a> at \
             <a href=\"http://t.co/x\" rel=\"nofollow\" target=\"_blank\" \
             title=\"http://wp.org\">wp.org</a>"
        );
    }

    #[test]
    fn render_tweet_without_entities_is_identity() {
        let raw = RawTweet {
            text: Some("<b>as is</b> & more".to_string()),
            ..RawTweet::default()
        };
        assert_eq!(render_tweet(&raw, &RenderOptions::default()), "<b>as is</b> & more");
    }
}
