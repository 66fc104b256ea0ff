//! The tweet wrapper.
//!
//! [`Tweet`] decorates a [`RawTweet`] with memoized rendering, verification
//! and the short "age" string used in timelines. Typed accessors cover the
//! fields this crate knows about; [`Tweet::field`] and [`Tweet::set_field`]
//! reach anything else in the upstream record.

use crate::entities::RenderOptions;
use crate::error::{Result, TapiError};
use crate::model::{RawTweet, TweetUser};
use crate::render::render_tweet;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

const MINUTE_IN_SECONDS: f64 = 60.0;
const HOUR_IN_SECONDS: f64 = 3600.0;
const DAY_IN_SECONDS: f64 = 86_400.0;

/// A wrapped tweet.
#[derive(Debug)]
pub struct Tweet {
    raw: Option<RawTweet>,
    verified: AtomicBool,
    rendered: OnceCell<String>,
    retweeted: Option<Arc<Tweet>>,
    options: Arc<RenderOptions>,
}

impl Tweet {
    /// Wrap a tweet with default render options.
    #[must_use]
    pub fn new(raw: RawTweet) -> Self {
        Self::with_options(raw, Arc::new(RenderOptions::default()))
    }

    /// Wrap a tweet, wrapping any retweeted status along with it.
    #[must_use]
    pub fn with_options(raw: RawTweet, options: Arc<RenderOptions>) -> Self {
        let retweeted = raw
            .retweeted_status
            .as_deref()
            .cloned()
            .map(|inner| Arc::new(Self::with_options(inner, Arc::clone(&options))));
        Self::from_parts(Some(raw), retweeted, options)
    }

    /// Wrap an arbitrary JSON value. Anything that is not a tweet object
    /// yields an unverified wrapper.
    #[must_use]
    pub fn from_value(value: Value, options: Arc<RenderOptions>) -> Self {
        if !value.is_object() {
            debug!("Wrapping non-object value as unverified tweet");
            return Self::from_parts(None, None, options);
        }
        match serde_json::from_value::<RawTweet>(value) {
            Ok(raw) => Self::with_options(raw, options),
            Err(err) => {
                debug!(error = %err, "Wrapping undecodable tweet as unverified");
                Self::from_parts(None, None, options)
            }
        }
    }

    pub(crate) fn from_parts(
        raw: Option<RawTweet>,
        retweeted: Option<Arc<Self>>,
        options: Arc<RenderOptions>,
    ) -> Self {
        Self {
            raw,
            verified: AtomicBool::new(false),
            rendered: OnceCell::new(),
            retweeted,
            options,
        }
    }

    /// Whether a valid tweet record has been attached. Once true, stays true.
    pub fn is_verified(&self) -> bool {
        if !self.verified.load(Ordering::Acquire) && self.raw.is_some() {
            self.verified.store(true, Ordering::Release);
        }
        self.verified.load(Ordering::Acquire)
    }

    fn verified_raw(&self) -> Result<&RawTweet> {
        if !self.is_verified() {
            return Err(TapiError::Unverified);
        }
        self.raw.as_ref().ok_or(TapiError::Unverified)
    }

    /// Tweet text with entities linked. Computed once per wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`TapiError::Unverified`] if there is no tweet record.
    pub fn rendered_text(&self) -> Result<&str> {
        let raw = self.verified_raw()?;
        Ok(self
            .rendered
            .get_or_init(|| render_tweet(raw, &self.options))
            .as_str())
    }

    /// Tweet text as received.
    ///
    /// # Errors
    ///
    /// Returns [`TapiError::Unverified`] if there is no tweet record.
    pub fn raw_text(&self) -> Result<&str> {
        Ok(self.verified_raw()?.display_text())
    }

    /// Short age string relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns [`TapiError::Unverified`] without a record and
    /// [`TapiError::InvalidDate`] if `created_at` is missing or unparseable.
    pub fn age(&self) -> Result<String> {
        self.age_at(Utc::now())
    }

    /// Short age string relative to `now`.
    ///
    /// # Errors
    ///
    /// Same as [`Tweet::age`].
    pub fn age_at(&self, now: DateTime<Utc>) -> Result<String> {
        Ok(format_age(self.created_at()?, now))
    }

    /// Parsed `created_at`.
    ///
    /// # Errors
    ///
    /// Same as [`Tweet::age`].
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        let raw = self.verified_raw()?;
        raw.created_at_utc().ok_or_else(|| {
            TapiError::invalid_date(raw.created_at.clone().unwrap_or_default(), "created_at")
        })
    }

    /// The underlying record.
    #[must_use]
    pub const fn raw(&self) -> Option<&RawTweet> {
        self.raw.as_ref()
    }

    #[must_use]
    pub fn id_str(&self) -> Option<String> {
        self.raw.as_ref().and_then(RawTweet::identity)
    }

    #[must_use]
    pub fn user(&self) -> Option<&TweetUser> {
        self.raw.as_ref().and_then(|raw| raw.user.as_ref())
    }

    /// The wrapped `retweeted_status`, if this is a retweet.
    #[must_use]
    pub const fn retweeted_status(&self) -> Option<&Arc<Self>> {
        self.retweeted.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Read any top-level field of the record by its API name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        let raw = self.raw.as_ref()?;
        if let Some(value) = raw.extra.get(name) {
            return Some(value.clone());
        }
        serde_json::to_value(raw)
            .ok()
            .and_then(|mut value| value.get_mut(name).map(Value::take))
    }

    /// Write any top-level field of the record by its API name. Clears the
    /// memoized rendering.
    ///
    /// # Errors
    ///
    /// Returns [`TapiError::Unverified`] without a record, or a JSON error if
    /// the value does not fit a typed field.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let raw = self.raw.as_mut().ok_or(TapiError::Unverified)?;
        let mut object = serde_json::to_value(&*raw)?;
        if let Some(map) = object.as_object_mut() {
            map.insert(name.to_string(), value);
        }
        *raw = serde_json::from_value(object)?;
        self.rendered = OnceCell::new();
        if name == "retweeted_status" {
            self.retweeted = raw
                .retweeted_status
                .as_deref()
                .cloned()
                .map(|inner| Arc::new(Self::with_options(inner, Arc::clone(&self.options))));
        }
        Ok(())
    }
}

/// Format the time between `created` and `now` the way timelines do:
/// `30s`, `5m`, `3h`, then `5 Jun` within a year and `5 Jun 22` beyond.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(created).num_seconds() as f64;

    if secs < MINUTE_IN_SECONDS {
        return format!("{}s", secs.round() as i64);
    }
    if secs / MINUTE_IN_SECONDS < 60.0 {
        return format!("{}m", (secs / MINUTE_IN_SECONDS).round() as i64);
    }
    if secs / HOUR_IN_SECONDS < 24.0 {
        return format!("{}h", (secs / HOUR_IN_SECONDS).round() as i64);
    }
    if secs / DAY_IN_SECONDS < 365.0 {
        return created.format("%-d %b").to_string();
    }
    created.format("%-d %b %y").to_string()
}
