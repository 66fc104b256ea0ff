//! Data models for Twitter API v1.1 tweet payloads.
//!
//! These structures mirror the JSON returned by the timeline, search and
//! status endpoints. Only the fields the renderer and the display helpers
//! need are typed; everything else is kept in the `extra` maps so that no
//! part of the upstream record is lost.
//!
//! Typed fields are decoded leniently: a field of the wrong JSON type reads
//! as its default instead of rejecting the tweet it belongs to.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A tweet as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTweet {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// String form of `id`. Always prefer this one, the integer may not
    /// survive a round trip through a double.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub id_str: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    /// Fixed-format timestamp, e.g. `Wed Jun 05 14:03:11 +0000 2024`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub entities: Option<Entities>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub user: Option<TweetUser>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub retweeted_status: Option<Box<RawTweet>>,
    /// Every field not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Author sub-record of a tweet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetUser {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id_str: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub screen_name: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub profile_image_url_https: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entity groups attached to a tweet.
///
/// The groups are kept as raw JSON so a single malformed entity can be
/// skipped without rejecting the whole tweet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub user_mentions: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `#hashtag` entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub text: String,
    pub indices: [usize; 2],
}

/// A link entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntity {
    pub url: String,
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub display_url: Option<String>,
    pub indices: [usize; 2],
}

/// An `@mention` entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEntity {
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id_str: Option<String>,
    pub indices: [usize; 2],
}

/// A media entity (photo, video, animated gif).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntity {
    pub url: String,
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub display_url: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_url_https: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    pub indices: [usize; 2],
}

impl RawTweet {
    /// Identity used as the cache key: `id_str`, or the integer id.
    #[must_use]
    pub fn identity(&self) -> Option<String> {
        if self.id_str.is_empty() {
            self.id.map(|id| id.to_string())
        } else {
            Some(self.id_str.clone())
        }
    }

    /// Text to render: `full_text` for extended tweets, else `text`.
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.full_text
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    /// Parsed `created_at`, if present and well formed.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_twitter_date)
    }
}

/// Decode a field, falling back to its default when the JSON value has the
/// wrong shape (`null` names, an object where an entity array belongs).
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|err| {
        debug!(error = %err, "Ignoring mistyped tweet field");
        T::default()
    }))
}

/// Parse Twitter's date format: "Wed Jun 05 14:03:11 +0000 2024".
#[must_use]
pub fn parse_twitter_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(date_str, "%a %b %d %H:%M:%S %z %Y")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_parse_twitter_date() {
        let dt = parse_twitter_date("Wed Jun 05 14:03:11 +0000 2024").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 6);
        assert_eq!(dt.day(), 5);
        assert_eq!(dt.hour(), 14);
        assert!(parse_twitter_date("2024-06-05").is_none());
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let raw: RawTweet = serde_json::from_value(json!({
            "id": 42,
            "id_str": "42",
            "text": "hi",
            "favorite_count": 7,
            "user": {"screen_name": "wp", "name": "WordPress", "followers_count": 3}
        }))
        .unwrap();

        assert_eq!(raw.extra["favorite_count"], json!(7));
        assert_eq!(raw.user.as_ref().unwrap().extra["followers_count"], json!(3));

        let back = serde_json::to_value(&raw).unwrap();
        assert_eq!(back["favorite_count"], json!(7));
        assert_eq!(back["user"]["screen_name"], json!("wp"));
    }

    #[test]
    fn test_identity_falls_back_to_integer_id() {
        let raw = RawTweet {
            id: Some(99),
            ..RawTweet::default()
        };
        assert_eq!(raw.identity().as_deref(), Some("99"));
        assert_eq!(RawTweet::default().identity(), None);
    }

    #[test]
    fn test_display_text_prefers_full_text() {
        let mut raw = RawTweet {
            text: Some("short".to_string()),
            ..RawTweet::default()
        };
        assert_eq!(raw.display_text(), "short");

        raw.full_text = Some("the long one".to_string());
        assert_eq!(raw.display_text(), "the long one");

        raw.full_text = Some(String::new());
        assert_eq!(raw.display_text(), "short");
    }

    #[test]
    fn test_mistyped_fields_read_as_defaults() {
        let raw: RawTweet = serde_json::from_value(json!({
            "id": "not a number",
            "id_str": "5",
            "text": "hi #x",
            "user": {"name": null, "screen_name": 12, "profile_image_url": false},
            "entities": {
                "hashtags": [{"text": "x", "indices": [3, 5]}],
                "urls": {},
                "media": "none"
            }
        }))
        .unwrap();

        assert_eq!(raw.id, None);
        assert_eq!(raw.identity().as_deref(), Some("5"));
        let user = raw.user.as_ref().unwrap();
        assert_eq!(user.name, "");
        assert_eq!(user.screen_name, "");
        assert_eq!(user.profile_image_url, None);
        let entities = raw.entities.as_ref().unwrap();
        assert_eq!(entities.hashtags.as_ref().map(Vec::len), Some(1));
        assert_eq!(entities.urls, None);
        assert_eq!(entities.media, None);
    }

    #[test]
    fn test_non_object_sub_records_are_dropped() {
        let raw: RawTweet = serde_json::from_value(json!({
            "text": "hi",
            "user": "someone",
            "entities": [],
            "retweeted_status": 7
        }))
        .unwrap();
        assert!(raw.user.is_none());
        assert!(raw.entities.is_none());
        assert!(raw.retweeted_status.is_none());
        assert_eq!(raw.display_text(), "hi");
    }

    #[test]
    fn test_nested_retweet_deserializes() {
        let raw: RawTweet = serde_json::from_value(json!({
            "id_str": "2",
            "text": "RT @a: hello",
            "retweeted_status": {"id_str": "1", "text": "hello"}
        }))
        .unwrap();
        let inner = raw.retweeted_status.unwrap();
        assert_eq!(inner.id_str, "1");
        assert_eq!(inner.display_text(), "hello");
    }
}
