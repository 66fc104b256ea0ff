//! Template helpers for wrapped tweets: author details, permalinks,
//! timestamps and media.

use crate::error::{Result, TapiError};
use crate::model::TweetUser;
use crate::tweet::{Tweet, format_age};
use chrono::{DateTime, Datelike, Months, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile and status links always point here.
pub const PERMALINK_BASE: &str = "https://twitter.com";

static TCO_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://t\.co/\S+").expect("valid t.co pattern"));

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\n\r|\n|\r").expect("valid line break pattern"));

/// Which avatar URL to hand out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

/// How [`Tweet::timestamp`] formats `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    /// As received from the API.
    Raw,
    /// `5 Jun 24`.
    Short,
    /// Seconds since the epoch.
    Unix,
    /// `3 days ago`.
    Relative,
    /// Short timeline age, `5m`.
    Age,
    /// Any `strftime` pattern.
    Custom(String),
}

impl Tweet {
    fn require_user(&self) -> Result<&TweetUser> {
        if !self.is_verified() {
            return Err(TapiError::Unverified);
        }
        self.user()
            .ok_or_else(|| TapiError::invalid_argument("tweet has no user record"))
    }

    /// The author record.
    ///
    /// # Errors
    ///
    /// Fails when unverified or when the tweet carries no user.
    pub fn author(&self) -> Result<&TweetUser> {
        self.require_user()
    }

    /// # Errors
    ///
    /// See [`Tweet::author`].
    pub fn author_name(&self) -> Result<&str> {
        Ok(&self.require_user()?.name)
    }

    /// # Errors
    ///
    /// See [`Tweet::author`].
    pub fn author_screen_name(&self) -> Result<&str> {
        Ok(&self.require_user()?.screen_name)
    }

    /// Avatar URL for the requested protocol, if the API sent one.
    ///
    /// # Errors
    ///
    /// See [`Tweet::author`].
    pub fn author_avatar_url(&self, protocol: Protocol) -> Result<Option<&str>> {
        let user = self.require_user()?;
        Ok(match protocol {
            Protocol::Http => user.profile_image_url.as_deref(),
            Protocol::Https => user.profile_image_url_https.as_deref(),
        })
    }

    /// `https://twitter.com/<screen_name>`.
    ///
    /// # Errors
    ///
    /// See [`Tweet::author`].
    pub fn author_permalink(&self) -> Result<String> {
        Ok(format!("{PERMALINK_BASE}/{}", self.author_screen_name()?))
    }

    /// `https://twitter.com/<screen_name>/status/<id>`.
    ///
    /// # Errors
    ///
    /// See [`Tweet::author`]; also fails if the tweet has no id.
    pub fn permalink(&self) -> Result<String> {
        let id = self
            .id_str()
            .ok_or_else(|| TapiError::invalid_argument("tweet has no id"))?;
        Ok(format!("{}/status/{id}", self.author_permalink()?))
    }

    /// Format `created_at` relative to the current time where relevant.
    ///
    /// # Errors
    ///
    /// Fails when unverified or when `created_at` does not parse.
    pub fn timestamp(&self, format: &TimestampFormat) -> Result<String> {
        self.timestamp_at(format, Utc::now())
    }

    /// Format `created_at`, using `now` for the relative formats.
    ///
    /// # Errors
    ///
    /// See [`Tweet::timestamp`].
    pub fn timestamp_at(&self, format: &TimestampFormat, now: DateTime<Utc>) -> Result<String> {
        Ok(match format {
            TimestampFormat::Raw => {
                let raw = self.raw().ok_or(TapiError::Unverified)?;
                raw.created_at.clone().unwrap_or_default()
            }
            TimestampFormat::Short => self.created_at()?.format("%-d %b %y").to_string(),
            TimestampFormat::Unix => self.created_at()?.timestamp().to_string(),
            TimestampFormat::Relative => format_relative_time(self.created_at()?, now),
            TimestampFormat::Age => format_age(self.created_at()?, now),
            TimestampFormat::Custom(pattern) => self.created_at()?.format(pattern).to_string(),
        })
    }

    /// Relative time such as `3 days ago`, against the current time.
    ///
    /// # Errors
    ///
    /// See [`Tweet::timestamp`].
    pub fn relative_time(&self) -> Result<String> {
        self.relative_time_at(Utc::now())
    }

    /// Relative time against `now`.
    ///
    /// # Errors
    ///
    /// See [`Tweet::timestamp`].
    pub fn relative_time_at(&self, now: DateTime<Utc>) -> Result<String> {
        Ok(format_relative_time(self.created_at()?, now))
    }

    /// Image URL of the first media item, preferring https.
    #[must_use]
    pub fn media_urls(&self) -> Vec<String> {
        let Some(media) = self
            .raw()
            .and_then(|raw| raw.entities.as_ref())
            .and_then(|entities| entities.media.as_ref())
        else {
            return Vec::new();
        };
        let Some(first) = media.first() else {
            return Vec::new();
        };
        ["media_url_https", "media_url"]
            .into_iter()
            .find_map(|field| {
                first
                    .get(field)
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())
            })
            .map(str::to_string)
            .into_iter()
            .collect()
    }

    /// Display text with bare `https://t.co/` links turned into anchors and
    /// newlines into `<br />`. For extended tweets that arrive without
    /// entities.
    ///
    /// # Errors
    ///
    /// Returns [`TapiError::Unverified`] if there is no tweet record.
    pub fn linked_full_text(&self) -> Result<String> {
        let text = self.raw_text()?;
        let linked = TCO_LINK.replace_all(text, r#"<a href="$0" rel="nofollow">$0</a>"#);
        Ok(nl2br(&linked))
    }
}

/// `<br />` before every line break, keeping the break itself.
fn nl2br(text: &str) -> String {
    LINE_BREAK.replace_all(text, "<br />$0").into_owned()
}

/// Largest non-zero calendar unit between `then` and `now`, e.g.
/// `1 year ago`, `3 weeks ago`, or `just now`.
#[must_use]
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let (earlier, later) = if then <= now { (then, now) } else { (now, then) };

    let mut months = u32::try_from(
        (later.year() - earlier.year()) * 12 + later.month() as i32 - earlier.month() as i32,
    )
    .unwrap_or(0);
    let mut anchor = earlier;
    while months > 0 {
        match earlier.checked_add_months(Months::new(months)) {
            Some(candidate) if candidate <= later => {
                anchor = candidate;
                break;
            }
            _ => months -= 1,
        }
    }

    let rest = later.signed_duration_since(anchor);
    let days = rest.num_days();
    let units = [
        (i64::from(months / 12), "year"),
        (i64::from(months % 12), "month"),
        (days / 7, "week"),
        (days % 7, "day"),
        (rest.num_hours() % 24, "hour"),
        (rest.num_minutes() % 60, "minute"),
        (rest.num_seconds() % 60, "second"),
    ];

    units
        .iter()
        .find(|(n, _)| *n > 0)
        .map_or_else(
            || "just now".to_string(),
            |(n, unit)| format!("{n} {unit}{} ago", if *n > 1 { "s" } else { "" }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTweet;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn tweet() -> Tweet {
        Tweet::new(
            serde_json::from_value::<RawTweet>(json!({
                "id_str": "1001",
                "full_text": "Line one\nsee https://t.co/abc and https://t.co/def",
                "created_at": "Wed Jun 05 14:03:11 +0000 2024",
                "user": {
                    "name": "Pat",
                    "screen_name": "PatDev",
                    "profile_image_url": "http://img/a.png",
                    "profile_image_url_https": "https://img/a.png"
                },
                "entities": {"media": [
                    {"url": "https://t.co/m", "media_url": "http://pbs/1.jpg", "indices": [0, 1]},
                    {"url": "https://t.co/n", "media_url_https": "https://pbs/2.jpg", "indices": [2, 3]}
                ]}
            }))
            .unwrap(),
        )
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).single().unwrap()
    }

    #[test]
    fn author_helpers() {
        let tweet = tweet();
        assert_eq!(tweet.author_name().unwrap(), "Pat");
        assert_eq!(tweet.author_screen_name().unwrap(), "PatDev");
        assert_eq!(tweet.author_avatar_url(Protocol::Http).unwrap(), Some("http://img/a.png"));
        assert_eq!(
            tweet.author_avatar_url(Protocol::Https).unwrap(),
            Some("https://img/a.png")
        );
        assert_eq!(tweet.author_permalink().unwrap(), "https://twitter.com/PatDev");
        assert_eq!(
            tweet.permalink().unwrap(),
            "https://twitter.com/PatDev/status/1001"
        );
    }

    #[test]
    fn helpers_fail_without_record() {
        let tweet = Tweet::from_value(serde_json::Value::Null, std::sync::Arc::default());
        assert!(matches!(tweet.author(), Err(TapiError::Unverified)));
        assert!(matches!(
            tweet.timestamp(&TimestampFormat::Raw),
            Err(TapiError::Unverified)
        ));
        assert!(tweet.media_urls().is_empty());
    }

    #[test]
    fn timestamp_formats() {
        let tweet = tweet();
        let now = at(2024, 6, 8, 14, 3, 11);
        assert_eq!(
            tweet.timestamp_at(&TimestampFormat::Raw, now).unwrap(),
            "Wed Jun 05 14:03:11 +0000 2024"
        );
        assert_eq!(tweet.timestamp_at(&TimestampFormat::Short, now).unwrap(), "5 Jun 24");
        assert_eq!(tweet.timestamp_at(&TimestampFormat::Unix, now).unwrap(), "1717596191");
        assert_eq!(tweet.timestamp_at(&TimestampFormat::Relative, now).unwrap(), "3 days ago");
        assert_eq!(tweet.timestamp_at(&TimestampFormat::Age, now).unwrap(), "5 Jun");
        assert_eq!(
            tweet
                .timestamp_at(&TimestampFormat::Custom("%Y-%m-%d".into()), now)
                .unwrap(),
            "2024-06-05"
        );
    }

    #[test]
    fn relative_time_units() {
        let now = at(2024, 6, 20, 12, 0, 0);
        assert_eq!(format_relative_time(now, now), "just now");
        assert_eq!(format_relative_time(now - Duration::seconds(1), now), "1 second ago");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_relative_time(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(format_relative_time(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_relative_time(now - Duration::days(15), now), "2 weeks ago");
        assert_eq!(format_relative_time(at(2024, 4, 10, 12, 0, 0), now), "2 months ago");
        assert_eq!(format_relative_time(at(2022, 6, 20, 12, 0, 0), now), "2 years ago");
        assert_eq!(format_relative_time(at(2024, 5, 31, 12, 0, 0), now), "2 weeks ago");
    }

    #[test]
    fn media_urls_take_first_item() {
        assert_eq!(tweet().media_urls(), vec!["http://pbs/1.jpg".to_string()]);
    }

    #[test]
    fn media_urls_never_skip_to_a_later_item() {
        let tweet = Tweet::new(
            serde_json::from_value(json!({
                "text": "two pics",
                "entities": {"media": [
                    {"url": "https://t.co/m", "indices": [0, 1]},
                    {"url": "https://t.co/n", "media_url_https": "https://pbs/2.jpg", "indices": [2, 3]}
                ]}
            }))
            .unwrap(),
        );
        assert!(tweet.media_urls().is_empty());
    }

    #[test]
    fn linked_full_text_wraps_tco_links() {
        let html = tweet().linked_full_text().unwrap();
        assert_eq!(
            html,
            "Line one<br />\nsee <a href=\"https://t.co/abc\" rel=\"nofollow\">https://t.co/abc</a> \
             and <a href=\"https://t.co/def\" rel=\"nofollow\">https://t.co/def</a>"
        );
    }
}
