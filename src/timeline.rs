//! Timeline helpers: a user's latest tweets, a list's latest tweets, and
//! several users merged into one newest-first stream.

use crate::api::ApiParams;
use crate::cache::{DEFAULT_TTL, TtlCache};
use crate::config::Config;
use crate::error::{Result, TapiError};
use crate::store::TweetStore;
use crate::tweet::Tweet;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A Twitter list, by numeric id or by slug and owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRef {
    Id(u64),
    Slug { slug: String, owner: String },
}

impl ListRef {
    /// Numeric input is an id; anything else is a slug owned by `owner`.
    ///
    /// # Errors
    ///
    /// A slug without an owner is rejected.
    pub fn parse(list: &str, owner: Option<&str>) -> Result<Self> {
        if let Ok(id) = list.parse::<u64>() {
            return Ok(Self::Id(id));
        }
        match owner.filter(|o| !o.is_empty()) {
            Some(owner) => Ok(Self::Slug {
                slug: list.to_string(),
                owner: owner.to_string(),
            }),
            None => Err(TapiError::invalid_argument(format!(
                "list slug '{list}' needs an owner screen name"
            ))),
        }
    }

    fn params(&self) -> ApiParams {
        match self {
            Self::Id(id) => ApiParams::new().with("list_id", id),
            Self::Slug { slug, owner } => ApiParams::new()
                .with("slug", slug)
                .with("owner_screen_name", owner),
        }
    }
}

impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug { slug, owner } => write!(f, "@{owner}/{slug}"),
        }
    }
}

impl FromStr for ListRef {
    type Err = TapiError;

    /// `123`, or `owner/slug` with an optional leading `@`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, slug)) => Self::parse(slug, Some(owner.trim_start_matches('@'))),
            None => Self::parse(s, None),
        }
    }
}

/// Timeline requests with shared defaults and a cache for merged timelines.
#[derive(Debug)]
pub struct Timelines {
    defaults: ApiParams,
    merged: TtlCache<String, Vec<Arc<Tweet>>>,
}

impl Default for Timelines {
    fn default() -> Self {
        Self::new(crate::api::timeline_defaults(), DEFAULT_TTL)
    }
}

impl Timelines {
    #[must_use]
    pub fn new(defaults: ApiParams, merged_ttl: Duration) -> Self {
        Self {
            defaults,
            merged: TtlCache::new(merged_ttl),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.timeline_params(), config.merged_ttl())
    }

    #[must_use]
    pub const fn defaults(&self) -> &ApiParams {
        &self.defaults
    }

    #[must_use]
    pub const fn merged_cache(&self) -> &TtlCache<String, Vec<Arc<Tweet>>> {
        &self.merged
    }

    /// The latest `count` tweets from `screen_name`.
    ///
    /// # Errors
    ///
    /// API errors propagate. A user with no tweets is an empty list.
    #[instrument(level = "debug", skip(self, store))]
    pub fn user_timeline(
        &self,
        store: &TweetStore,
        screen_name: &str,
        count: u32,
    ) -> Result<Vec<Arc<Tweet>>> {
        let params = ApiParams::new()
            .with("screen_name", screen_name)
            .with("count", count)
            .with_defaults(&self.defaults);
        let values = store.api().get_user_timeline(params)?;
        Ok(values.into_iter().map(|v| store.wrap_value(v)).collect())
    }

    /// The latest `count` tweets from a list.
    ///
    /// # Errors
    ///
    /// API errors propagate.
    #[instrument(level = "debug", skip(self, store, list), fields(list = %list))]
    pub fn list_timeline(
        &self,
        store: &TweetStore,
        list: &ListRef,
        count: u32,
    ) -> Result<Vec<Arc<Tweet>>> {
        let params = list
            .params()
            .with("count", count)
            .with_defaults(&self.defaults);
        let values = store.api().get_list_timeline(params)?;
        Ok(values.into_iter().map(|v| store.wrap_value(v)).collect())
    }

    /// The latest `count` tweets across `screen_names`, newest first.
    ///
    /// Results are cached per count and name list. Tweets whose date does
    /// not parse sort last.
    ///
    /// # Errors
    ///
    /// The first API error aborts the merge and nothing is cached.
    pub fn merged_user_timelines<S: AsRef<str>>(
        &self,
        store: &TweetStore,
        screen_names: &[S],
        count: u32,
    ) -> Result<Vec<Arc<Tweet>>> {
        let names: Vec<&str> = screen_names.iter().map(AsRef::as_ref).collect();
        let key = format!("{count},{}", names.join(","));
        if let Some(hit) = self.merged.get(&key) {
            debug!(key = %key, "Merged timeline cache hit");
            return Ok(hit);
        }

        let mut tweets = Vec::new();
        for name in &names {
            tweets.extend(self.user_timeline(store, name, count)?);
        }
        tweets.sort_by_key(|tweet| Reverse(tweet.created_at().ok()));
        tweets.truncate(usize::try_from(count).unwrap_or(usize::MAX));

        debug!(key = %key, count = tweets.len(), "Merged timeline cache store");
        self.merged.insert(key, tweets.clone());
        Ok(tweets)
    }
}
