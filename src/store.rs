//! Wrapper lookup and caching.
//!
//! [`TweetStore::get_or_create`] is the single way wrappers are obtained:
//! an existing wrapper passes straight through, a raw record is wrapped and
//! cached under its `id_str`, and a bare id is looked up in the cache and
//! fetched from the API on a miss.

use crate::api::{ApiParams, TwitterApi};
use crate::cache::{DEFAULT_TTL, TtlCache};
use crate::config::Config;
use crate::entities::RenderOptions;
use crate::error::{Result, TapiError};
use crate::model::RawTweet;
use crate::tweet::Tweet;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Anything [`TweetStore::get_or_create`] accepts.
#[derive(Debug, Clone)]
pub enum TweetRef {
    Wrapped(Arc<Tweet>),
    Raw(RawTweet),
    Id(String),
}

impl From<Arc<Tweet>> for TweetRef {
    fn from(tweet: Arc<Tweet>) -> Self {
        Self::Wrapped(tweet)
    }
}

impl From<RawTweet> for TweetRef {
    fn from(raw: RawTweet) -> Self {
        Self::Raw(raw)
    }
}

impl From<String> for TweetRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for TweetRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<u64> for TweetRef {
    fn from(id: u64) -> Self {
        Self::Id(id.to_string())
    }
}

/// Creates, caches and fetches [`Tweet`] wrappers.
pub struct TweetStore {
    api: Arc<dyn TwitterApi>,
    cache: TtlCache<String, Arc<Tweet>>,
    options: Arc<RenderOptions>,
}

impl std::fmt::Debug for TweetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweetStore")
            .field("cached", &self.cache.len())
            .field("ttl", &self.cache.ttl())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TweetStore {
    /// A store with the default TTL and render options.
    #[must_use]
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self::with_settings(api, DEFAULT_TTL, RenderOptions::default())
    }

    #[must_use]
    pub fn with_settings(api: Arc<dyn TwitterApi>, ttl: Duration, options: RenderOptions) -> Self {
        Self {
            api,
            cache: TtlCache::new(ttl),
            options: Arc::new(options),
        }
    }

    /// A store configured from [`Config`].
    #[must_use]
    pub fn from_config(api: Arc<dyn TwitterApi>, config: &Config) -> Self {
        Self::with_settings(api, config.tweet_ttl(), config.render_options())
    }

    /// The API this store fetches from.
    #[must_use]
    pub fn api(&self) -> &dyn TwitterApi {
        self.api.as_ref()
    }

    #[must_use]
    pub const fn cache(&self) -> &TtlCache<String, Arc<Tweet>> {
        &self.cache
    }

    #[must_use]
    pub fn options(&self) -> &Arc<RenderOptions> {
        &self.options
    }

    /// Resolve a wrapper, raw record or id to a wrapper.
    ///
    /// # Errors
    ///
    /// Ids that are neither cached nor known upstream give
    /// [`TapiError::NotFound`]; API failures propagate unchanged.
    #[instrument(level = "debug", skip_all)]
    pub fn get_or_create(&self, tweet: impl Into<TweetRef>) -> Result<Arc<Tweet>> {
        match tweet.into() {
            TweetRef::Wrapped(tweet) => Ok(tweet),
            TweetRef::Raw(raw) => Ok(self.wrap(raw)),
            TweetRef::Id(id) => self.lookup(&id),
        }
    }

    /// Wrap a raw record, reusing the cached wrapper for its id.
    pub fn wrap(&self, raw: RawTweet) -> Arc<Tweet> {
        let key = raw.identity();
        if let Some(hit) = key.as_deref().and_then(|id| self.cache.get(id)) {
            debug!(id = ?key, "Tweet cache hit");
            return hit;
        }

        let retweeted = raw
            .retweeted_status
            .as_deref()
            .cloned()
            .map(|inner| self.wrap(inner));
        let tweet = Arc::new(Tweet::from_parts(
            Some(raw),
            retweeted,
            Arc::clone(&self.options),
        ));

        if let Some(id) = key {
            debug!(id = %id, "Tweet cache store");
            self.cache.insert(id, Arc::clone(&tweet));
        }
        tweet
    }

    /// Wrap a JSON value from an API response. Values that are not tweet
    /// records become unverified wrappers and are not cached.
    pub fn wrap_value(&self, value: Value) -> Arc<Tweet> {
        if value.is_object() {
            match serde_json::from_value::<RawTweet>(value.clone()) {
                Ok(raw) => return self.wrap(raw),
                Err(err) => debug!(error = %err, "Undecodable tweet in response"),
            }
        }
        Arc::new(Tweet::from_value(value, Arc::clone(&self.options)))
    }

    fn lookup(&self, id: &str) -> Result<Arc<Tweet>> {
        if let Some(hit) = self.cache.get(id) {
            debug!(id = %id, "Tweet cache hit");
            return Ok(hit);
        }

        let path = format!("statuses/show/{id}");
        let response = self.api.get(&path, &ApiParams::new())?;
        if !response.is_object() || response.as_object().is_some_and(serde_json::Map::is_empty) {
            return Err(TapiError::not_found(id));
        }
        let raw: RawTweet = serde_json::from_value(response)?;
        Ok(self.wrap(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use serde_json::json;

    fn raw(id: &str, text: &str) -> RawTweet {
        RawTweet {
            id_str: id.to_string(),
            text: Some(text.to_string()),
            ..RawTweet::default()
        }
    }

    #[test]
    fn wrapped_passes_through() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let tweet = Arc::new(Tweet::new(raw("1", "a")));
        let same = store.get_or_create(Arc::clone(&tweet)).unwrap();
        assert!(Arc::ptr_eq(&tweet, &same));
    }

    #[test]
    fn raw_records_are_cached_by_id() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let first = store.get_or_create(raw("1", "a #b")).unwrap();
        let second = store.get_or_create(raw("1", "a #b")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.rendered_text().unwrap(), second.rendered_text().unwrap());
    }

    #[test]
    fn expired_entries_are_rebuilt() {
        let store = TweetStore::with_settings(
            Arc::new(MemoryApi::new()),
            Duration::ZERO,
            RenderOptions::default(),
        );
        let first = store.get_or_create(raw("1", "a")).unwrap();
        let second = store.get_or_create(raw("1", "a")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.rendered_text().unwrap(), second.rendered_text().unwrap());
    }

    #[test]
    fn records_without_id_are_not_cached() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let tweet = store.get_or_create(RawTweet::default()).unwrap();
        assert!(tweet.is_verified());
        assert!(store.cache().is_empty());
    }

    #[test]
    fn id_lookup_fetches_on_miss_then_hits_cache() {
        let api = Arc::new(
            MemoryApi::new()
                .with_response("statuses/show/7", json!({"id_str": "7", "text": "seven"})),
        );
        let store = TweetStore::new(Arc::clone(&api) as Arc<dyn TwitterApi>);

        let tweet = store.get_or_create("7").unwrap();
        assert_eq!(tweet.raw_text().unwrap(), "seven");
        let again = store.get_or_create(7_u64).unwrap();
        assert!(Arc::ptr_eq(&tweet, &again));
        assert_eq!(api.call_count(), 1);
    }

    #[test]
    fn id_lookup_without_data_is_not_found() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let err = store.get_or_create("404").unwrap_err();
        assert!(matches!(err, TapiError::NotFound { ref id } if id == "404"));
    }

    #[test]
    fn id_lookup_propagates_fetch_errors() {
        let api = MemoryApi::new();
        api.fail("statuses/show/9", "401 Unauthorized");
        let store = TweetStore::new(Arc::new(api));
        let err = store.get_or_create("9").unwrap_err();
        assert!(matches!(err, TapiError::Fetch { .. }));
    }

    #[test]
    fn retweets_are_wrapped_and_cached_recursively() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let mut outer = raw("2", "RT @a: hi");
        outer.retweeted_status = Some(Box::new(raw("1", "hi")));

        let tweet = store.get_or_create(outer).unwrap();
        let inner = tweet.retweeted_status().unwrap();
        let cached_inner = store.get_or_create("1").unwrap();
        assert!(Arc::ptr_eq(inner, &cached_inner));
    }

    #[test]
    fn wrap_value_handles_non_objects() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        assert!(!store.wrap_value(json!(42)).is_verified());
        assert!(store.wrap_value(json!({"id_str": "3"})).is_verified());
    }

    #[test]
    fn mistyped_group_does_not_drop_the_tweet() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let tweet = store.wrap_value(json!({
            "id_str": "11",
            "text": "hi #x",
            "user": {"name": null, "screen_name": "pat"},
            "entities": {
                "hashtags": [{"text": "x", "indices": [3, 5]}],
                "urls": {}
            }
        }));

        assert!(tweet.is_verified());
        let html = tweet.rendered_text().unwrap();
        assert!(html.starts_with("hi <a href=\"https://twitter.com/search?q=%23x"));
        assert!(html.ends_with(">#x</a>"));
        assert_eq!(tweet.user().map(|u| u.screen_name.as_str()), Some("pat"));
    }

    #[test]
    fn not_found_is_retried_behind_cached_api() {
        let api = Arc::new(crate::api::CachedApi::new(
            MemoryApi::new(),
            Duration::from_secs(60),
        ));
        let store = TweetStore::new(Arc::clone(&api) as Arc<dyn TwitterApi>);
        assert!(matches!(
            store.get_or_create("12"),
            Err(TapiError::NotFound { .. })
        ));

        api.inner()
            .respond("statuses/show/12", json!({"id_str": "12", "text": "late"}));
        let tweet = store.get_or_create("12").unwrap();
        assert_eq!(tweet.raw_text().unwrap(), "late");
        assert_eq!(api.inner().call_count(), 2);
    }
}
