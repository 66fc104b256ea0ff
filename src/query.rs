//! Tweet queries and the loop.
//!
//! A [`TweetQuery`] names an endpoint and its params. Running it through a
//! [`TweetStore`] yields a [`TweetCollection`], a forward cursor with the
//! usual template-loop shape:
//!
//! ```ignore
//! while tweets.has_next() {
//!     let tweet = tweets.advance().unwrap();
//!     println!("{}", tweet.rendered_text()?);
//! }
//! ```
//!
//! The cursor state lives on the collection, so several loops can run side
//! by side.

use crate::api::ApiParams;
use crate::error::{Result, TapiError};
use crate::model::RawTweet;
use crate::store::TweetStore;
use crate::tweet::Tweet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Which endpoint a query reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryType {
    UserTimeline,
    HomeTimeline,
    MentionsTimeline,
    /// A single status by id.
    Show(String),
    /// Retweets of a status by id.
    Retweets(String),
    Search,
    ListTimeline,
    /// Any other `statuses/<name>` endpoint.
    Statuses(String),
}

impl QueryType {
    /// Endpoint path, relative to the API host.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::UserTimeline => "statuses/user_timeline".to_string(),
            Self::HomeTimeline => "statuses/home_timeline".to_string(),
            Self::MentionsTimeline => "statuses/mentions_timeline".to_string(),
            Self::Show(id) => format!("statuses/show/{id}"),
            Self::Retweets(id) => format!("statuses/retweets/{id}"),
            Self::Search => "search/tweets".to_string(),
            Self::ListTimeline => "lists/statuses".to_string(),
            Self::Statuses(name) => format!("statuses/{name}"),
        }
    }

    /// Resolve a type name, taking the id for the types that need one.
    ///
    /// # Errors
    ///
    /// `show` and `retweets` without an id are invalid.
    pub fn resolve(name: &str, id: Option<String>) -> Result<Self> {
        let needs_id = |kind: fn(String) -> Self| {
            id.clone()
                .filter(|id| !id.is_empty())
                .map(kind)
                .ok_or_else(|| TapiError::invalid_argument(format!("'{name}' queries need an id")))
        };
        match name {
            "" | "user_timeline" => Ok(Self::UserTimeline),
            "home_timeline" => Ok(Self::HomeTimeline),
            "mentions_timeline" => Ok(Self::MentionsTimeline),
            "show" => needs_id(Self::Show),
            "retweets" => needs_id(Self::Retweets),
            "search" => Ok(Self::Search),
            "list_timeline" => Ok(Self::ListTimeline),
            other => Ok(Self::Statuses(other.to_string())),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// An endpoint plus the params sent to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetQuery {
    pub kind: QueryType,
    pub params: ApiParams,
}

impl TweetQuery {
    #[must_use]
    pub fn new(kind: QueryType) -> Self {
        Self {
            kind,
            params: ApiParams::new(),
        }
    }

    /// Builder-style param.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Build from loose args: `type` picks the endpoint (default
    /// `user_timeline`), `id` is consumed by `show` and `retweets`, the rest
    /// are request params.
    ///
    /// # Errors
    ///
    /// See [`QueryType::resolve`].
    pub fn from_args(mut args: ApiParams) -> Result<Self> {
        let name = args.remove("type").unwrap_or_default();
        let kind = if matches!(name.as_str(), "show" | "retweets") {
            QueryType::resolve(&name, args.remove("id"))?
        } else {
            QueryType::resolve(&name, None)?
        };
        Ok(Self { kind, params: args })
    }

    #[must_use]
    pub fn path(&self) -> String {
        self.kind.path()
    }
}

impl FromStr for TweetQuery {
    type Err = TapiError;

    /// Parse `type=search&q=rust` style args.
    fn from_str(s: &str) -> Result<Self> {
        Self::from_args(ApiParams::parse_query(s))
    }
}

/// A forward cursor over wrapped tweets.
#[derive(Debug, Clone, Default)]
pub struct TweetCollection {
    tweets: Vec<Arc<Tweet>>,
    /// Index of the last tweet handed out by `advance`.
    cursor: Option<usize>,
    /// Index of the current tweet.
    current: Option<usize>,
    in_the_loop: bool,
}

impl TweetCollection {
    #[must_use]
    pub const fn new(tweets: Vec<Arc<Tweet>>) -> Self {
        Self {
            tweets,
            cursor: None,
            current: None,
            in_the_loop: false,
        }
    }

    /// Run `query` against the store's API and wrap every result.
    ///
    /// # Errors
    ///
    /// API errors propagate unchanged. An empty response is an empty
    /// collection.
    pub fn query(store: &TweetStore, query: &TweetQuery) -> Result<Self> {
        let path = query.path();
        let values = store.api().get_tweets(&path, &query.params)?;
        debug!(path = %path, count = values.len(), "Queried tweets");
        Ok(Self::new(
            values.into_iter().map(|value| store.wrap_value(value)).collect(),
        ))
    }

    /// Wrap already fetched records.
    pub fn from_raw(store: &TweetStore, tweets: impl IntoIterator<Item = RawTweet>) -> Self {
        Self::new(tweets.into_iter().map(|raw| store.wrap(raw)).collect())
    }

    /// Whether another tweet is available. When the loop is exhausted the
    /// cursor rewinds to the start and the loop is marked inactive.
    pub fn has_next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.tweets.len() {
            return true;
        }
        if next == self.tweets.len() && !self.tweets.is_empty() {
            self.rewind();
        }
        self.in_the_loop = false;
        false
    }

    /// Move to the next tweet and return it.
    pub fn advance(&mut self) -> Option<Arc<Tweet>> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let tweet = self.tweets.get(next)?;
        self.in_the_loop = true;
        self.cursor = Some(next);
        self.current = Some(next);
        Some(Arc::clone(tweet))
    }

    /// Reset the cursor. The current tweet becomes the first one.
    pub fn rewind(&mut self) {
        self.cursor = None;
        self.current = if self.tweets.is_empty() { None } else { Some(0) };
    }

    /// The tweet the loop is on.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<Tweet>> {
        self.current.and_then(|i| self.tweets.get(i))
    }

    /// Id of the current tweet.
    #[must_use]
    pub fn current_id(&self) -> Option<String> {
        self.current().and_then(|tweet| tweet.id_str())
    }

    /// Position of the last tweet handed out.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.tweets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    #[must_use]
    pub const fn in_the_loop(&self) -> bool {
        self.in_the_loop
    }

    #[must_use]
    pub fn tweets(&self) -> &[Arc<Tweet>] {
        &self.tweets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Tweet>> {
        self.tweets.iter()
    }

    #[must_use]
    pub fn into_tweets(self) -> Vec<Arc<Tweet>> {
        self.tweets
    }
}

impl<'a> IntoIterator for &'a TweetCollection {
    type Item = &'a Arc<Tweet>;
    type IntoIter = std::slice::Iter<'a, Arc<Tweet>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tweets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use serde_json::json;

    fn store_with(path: &str, response: serde_json::Value) -> TweetStore {
        TweetStore::new(Arc::new(MemoryApi::new().with_response(path, response)))
    }

    #[test]
    fn resolve_paths() {
        assert_eq!(QueryType::resolve("", None).unwrap().path(), "statuses/user_timeline");
        assert_eq!(
            QueryType::resolve("show", Some("5".into())).unwrap().path(),
            "statuses/show/5"
        );
        assert_eq!(
            QueryType::resolve("retweets", Some("5".into())).unwrap().path(),
            "statuses/retweets/5"
        );
        assert_eq!(QueryType::resolve("search", None).unwrap().path(), "search/tweets");
        assert_eq!(QueryType::resolve("list_timeline", None).unwrap().path(), "lists/statuses");
        assert_eq!(
            QueryType::resolve("home_timeline", None).unwrap().path(),
            "statuses/home_timeline"
        );
        assert!(QueryType::resolve("show", None).is_err());
    }

    #[test]
    fn from_args_consumes_type_and_id() {
        let query: TweetQuery = "type=show&id=9&trim_user=1".parse().unwrap();
        assert_eq!(query.kind, QueryType::Show("9".to_string()));
        assert_eq!(query.params.get("id"), None);
        assert_eq!(query.params.get("type"), None);
        assert_eq!(query.params.get("trim_user"), Some("1"));

        let query: TweetQuery = "screen_name=wp".parse().unwrap();
        assert_eq!(query.kind, QueryType::UserTimeline);
        assert_eq!(query.params.get("screen_name"), Some("wp"));
    }

    #[test]
    fn loop_visits_every_tweet_then_rewinds() {
        let store = store_with(
            "statuses/user_timeline",
            json!([{"id_str": "1", "text": "a"}, {"id_str": "2", "text": "b"}]),
        );
        let mut tweets =
            TweetCollection::query(&store, &TweetQuery::new(QueryType::UserTimeline)).unwrap();
        assert_eq!(tweets.count(), 2);

        let mut seen = Vec::new();
        while tweets.has_next() {
            let tweet = tweets.advance().unwrap();
            assert!(tweets.in_the_loop());
            seen.push(tweet.raw_text().unwrap().to_string());
        }
        assert_eq!(seen, vec!["a", "b"]);
        assert!(!tweets.in_the_loop());
        assert_eq!(tweets.position(), None);
        assert_eq!(tweets.current_id().as_deref(), Some("1"));

        assert!(tweets.has_next());
    }

    #[test]
    fn empty_response_is_empty_loop() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let mut tweets =
            TweetCollection::query(&store, &TweetQuery::new(QueryType::Search)).unwrap();
        assert!(tweets.is_empty());
        assert!(!tweets.has_next());
        assert!(tweets.advance().is_none());
        assert!(tweets.current().is_none());
    }

    #[test]
    fn search_results_are_unwrapped() {
        let store = store_with(
            "search/tweets",
            json!({"statuses": [{"id_str": "1", "text": "found"}], "search_metadata": {}}),
        );
        let query: TweetQuery = "type=search&q=found".parse().unwrap();
        let tweets = TweetCollection::query(&store, &query).unwrap();
        assert_eq!(tweets.count(), 1);
        assert_eq!(tweets.tweets()[0].raw_text().unwrap(), "found");
    }

    #[test]
    fn show_query_yields_single_tweet() {
        let store = store_with("statuses/show/3", json!({"id_str": "3", "text": "one"}));
        let query: TweetQuery = "type=show&id=3".parse().unwrap();
        let tweets = TweetCollection::query(&store, &query).unwrap();
        assert_eq!(tweets.iter().count(), 1);
    }

    #[test]
    fn advance_past_end_returns_none() {
        let store = TweetStore::new(Arc::new(MemoryApi::new()));
        let mut tweets = TweetCollection::from_raw(
            &store,
            vec![RawTweet {
                id_str: "1".to_string(),
                ..RawTweet::default()
            }],
        );
        assert!(tweets.advance().is_some());
        assert!(tweets.advance().is_none());
        assert_eq!(tweets.position(), Some(0));
    }
}
