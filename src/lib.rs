//! tapi - Twitter API tweet rendering
//!
//! This library wraps tweet objects from the Twitter REST API (v1.1) and
//! renders their text with hashtags, URLs, mentions and media linked.
//!
//! # Modules
//!
//! - [`model`] - Tweet records as they arrive from the API
//! - [`entities`] - Entity annotations to replacement spans
//! - [`render`] - Codepoint-safe span splicing
//! - [`tweet`] - The tweet wrapper with memoized rendering
//! - [`store`] - Wrapper lookup and caching
//! - [`api`] - The API collaborator and its response cache
//! - [`query`] - Query construction and loop iteration
//! - [`display`] - Author, permalink, timestamp and media helpers
//! - [`timeline`] - User, list and merged timelines
//! - [`cache`] - Time-bounded key-value cache
//! - [`config`] - Layered configuration
//! - [`error`] - Error types with rich context
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tapi::{MemoryApi, RawTweet, TweetStore};
//!
//! let raw: RawTweet = serde_json::from_value(serde_json::json!({
//!     "id_str": "1",
//!     "text": "Hello #World",
//!     "entities": {"hashtags": [{"text": "World", "indices": [6, 12]}]}
//! }))
//! .unwrap();
//!
//! let store = TweetStore::new(Arc::new(MemoryApi::new()));
//! let tweet = store.get_or_create(raw).unwrap();
//! assert!(tweet.rendered_text().unwrap().contains("q=%23world"));
//! ```

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod display;
pub mod entities;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod render;
pub mod store;
pub mod timeline;
pub mod tweet;

pub use api::{
    ApiParams, CachedApi, DEFAULT_COUNT, MemoryApi, TwitterApi,
    into_tweet_values, timeline_defaults,
};
pub use cache::{DEFAULT_TTL, TtlCache};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use display::{PERMALINK_BASE, Protocol, TimestampFormat, format_relative_time};
pub use entities::{
    DEFAULT_BASE_URL, EntityKind, RenderOptions, Span, SpanMap, escape_attr, escape_html,
    extract_entity_spans, extract_spans,
};
pub use error::{Result, TapiError, VALID_CONFIG_KEYS, format_error, format_tapi_error};
pub use logging::{LogConfig, LogFormat, LogLevel, init_cli_logging, init_logging};
pub use model::*;
pub use query::{QueryType, TweetCollection, TweetQuery};
pub use render::{apply_spans, render_spans, render_tweet, splice};
pub use store::{TweetRef, TweetStore};
pub use timeline::{ListRef, Timelines};
pub use tweet::{Tweet, format_age};
