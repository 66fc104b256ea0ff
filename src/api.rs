//! The Twitter API collaborator.
//!
//! The crate never signs or sends requests itself. Anything that can answer
//! `GET <path>?<params>` with JSON implements [`TwitterApi`] and is handed to
//! the [`TweetStore`](crate::store::TweetStore). [`CachedApi`] adds the
//! response cache, [`MemoryApi`] answers from memory.

use crate::cache::TtlCache;
use crate::error::{Result, TapiError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default number of tweets per timeline request.
pub const DEFAULT_COUNT: u32 = 20;

/// Query parameters of an API request, kept sorted so that equal requests
/// produce equal cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiParams(BTreeMap<String, String>);

impl ApiParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string such as `screen_name=wp&count=5`.
    #[must_use]
    pub fn parse_query(query: &str) -> Self {
        query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fill in `defaults` for every key not already set.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &Self) -> Self {
        for (key, value) in &defaults.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    /// Cache key for a request to `path` with these params.
    #[must_use]
    pub fn cache_key(&self, path: &str) -> String {
        format!("{path}?{self}")
    }
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s).map_or(s.clone(), |decoded| decoded.into_owned())
}

impl fmt::Display for ApiParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(
                f,
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for ApiParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Defaults applied to timeline requests.
#[must_use]
pub fn timeline_defaults() -> ApiParams {
    ApiParams::new()
        .with("count", DEFAULT_COUNT)
        .with("include_rts", 1)
}

/// Normalize an API response into a list of tweet values.
///
/// `null` is empty, arrays are taken as is, search responses are unwrapped
/// from `statuses`, and a single object becomes a list of one.
#[must_use]
pub fn into_tweet_values(response: Value) -> Vec<Value> {
    match response {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("statuses") {
            Some(Value::Array(items)) => items,
            Some(_) => Vec::new(),
            None if map.is_empty() => Vec::new(),
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    }
}

/// Something that can answer authenticated GET requests against the API.
pub trait TwitterApi: Send + Sync {
    /// Perform `GET path` with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`TapiError::Fetch`] for transport and auth failures.
    fn get(&self, path: &str, params: &ApiParams) -> Result<Value>;

    /// `GET` a list of tweets. Missing data is an empty list.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TwitterApi::get`].
    fn get_tweets(&self, path: &str, params: &ApiParams) -> Result<Vec<Value>> {
        Ok(into_tweet_values(self.get(path, params)?))
    }

    /// `statuses/user_timeline` with the timeline defaults.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TwitterApi::get`].
    fn get_user_timeline(&self, params: ApiParams) -> Result<Vec<Value>> {
        let params = params.with_defaults(&timeline_defaults());
        self.get_tweets("statuses/user_timeline", &params)
    }

    /// `lists/statuses` with the timeline defaults.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TwitterApi::get`].
    fn get_list_timeline(&self, params: ApiParams) -> Result<Vec<Value>> {
        let params = params.with_defaults(&timeline_defaults());
        self.get_tweets("lists/statuses", &params)
    }
}

impl<T: TwitterApi + ?Sized> TwitterApi for Arc<T> {
    fn get(&self, path: &str, params: &ApiParams) -> Result<Value> {
        (**self).get(path, params)
    }
}

impl<T: TwitterApi + ?Sized> TwitterApi for Box<T> {
    fn get(&self, path: &str, params: &ApiParams) -> Result<Value> {
        (**self).get(path, params)
    }
}

/// Response cache in front of another [`TwitterApi`].
///
/// Successful responses are kept for the cache TTL, keyed by path and
/// params. Errors and empty responses (`null`, `{}`, `[]`) pass through and
/// are never cached, so a lookup that found nothing is retried next time.
#[derive(Debug)]
pub struct CachedApi<A> {
    inner: A,
    cache: TtlCache<String, Value>,
}

impl<A: TwitterApi> CachedApi<A> {
    #[must_use]
    pub fn new(inner: A, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }

    #[must_use]
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    #[must_use]
    pub const fn cache(&self) -> &TtlCache<String, Value> {
        &self.cache
    }
}

impl<A: TwitterApi> TwitterApi for CachedApi<A> {
    fn get(&self, path: &str, params: &ApiParams) -> Result<Value> {
        let key = params.cache_key(path);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "Response cache hit");
            return Ok(hit);
        }
        debug!(key = %key, "Response cache miss");
        let response = self.inner.get(path, params)?;
        if is_empty_response(&response) {
            debug!(key = %key, "Empty response not cached");
        } else {
            self.cache.insert(key, response.clone());
        }
        Ok(response)
    }
}

fn is_empty_response(response: &Value) -> bool {
    match response {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone)]
enum Route {
    Respond(Value),
    Fail(String),
}

/// An API that answers from responses registered per path.
///
/// Unknown paths answer `null`, like an endpoint with no data. Used by the
/// CLI for offline rendering and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryApi {
    routes: RwLock<HashMap<String, Route>>,
    calls: AtomicUsize,
}

impl MemoryApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryApi::respond`].
    #[must_use]
    pub fn with_response(self, path: impl Into<String>, response: Value) -> Self {
        self.respond(path, response);
        self
    }

    /// Answer `path` with `response`.
    pub fn respond(&self, path: impl Into<String>, response: Value) {
        self.routes
            .write()
            .insert(path.into(), Route::Respond(response));
    }

    /// Fail requests to `path` with a fetch error.
    pub fn fail(&self, path: impl Into<String>, reason: impl Into<String>) {
        self.routes
            .write()
            .insert(path.into(), Route::Fail(reason.into()));
    }

    /// Number of requests served.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TwitterApi for MemoryApi {
    fn get(&self, path: &str, _params: &ApiParams) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.routes.read().get(path) {
            Some(Route::Respond(value)) => Ok(value.clone()),
            Some(Route::Fail(reason)) => Err(TapiError::fetch(path, reason.clone())),
            None => Ok(Value::Null),
        }
    }
}
