//! Custom error types for tapi.
//!
//! Provides structured error handling with detailed context for better
//! diagnostics and user experience.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for tapi operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling better error messages and programmatic error handling.
#[derive(Error, Debug)]
pub enum TapiError {
    // =========================================================================
    // Tweet Errors
    // =========================================================================
    /// The wrapper has never seen a valid underlying tweet.
    #[error("Tweet wrapper has no verified tweet record")]
    Unverified,

    /// Lookup by identifier found nothing, cached or upstream.
    #[error("Tweet with ID '{id}' not found")]
    NotFound { id: String },

    /// An entity is missing fields or carries unusable indices.
    #[error("Malformed {kind} entity: {reason}")]
    MalformedEntity { kind: &'static str, reason: String },

    /// Invalid date format in tweet data.
    #[error("Invalid date format '{value}' in {context}")]
    InvalidDate { value: String, context: String },

    // =========================================================================
    // API Errors
    // =========================================================================
    /// The API collaborator failed (transport, auth, rate limit).
    #[error("Request to '{path}' failed: {reason}")]
    Fetch { path: String, reason: String },

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    /// Invalid argument to a query or command.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for tapi operations.
pub type Result<T> = std::result::Result<T, TapiError>;

impl TapiError {
    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a fetch error for an API path.
    pub fn fetch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed entity error.
    pub fn malformed_entity(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedEntity {
            kind,
            reason: reason.into(),
        }
    }

    /// Create an invalid date error.
    pub fn invalid_date(value: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Check if this error is recoverable (user can fix it).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unverified
                | Self::NotFound { .. }
                | Self::MalformedEntity { .. }
                | Self::InvalidArgument { .. }
                | Self::ConfigError { .. }
        )
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Unverified => Some("Wrap a tweet object, not null or a scalar."),
            Self::NotFound { .. } => {
                Some("Check the tweet ID; deleted and protected tweets cannot be fetched.")
            }
            Self::Fetch { .. } => {
                Some("Verify the API credentials and network access, then try again.")
            }
            Self::ConfigError { .. } => {
                Some("Run 'tapi config --init' to write a fresh configuration file.")
            }
            Self::InvalidDate { .. } => {
                Some("Dates must look like 'Wed Jun 05 14:03:11 +0000 2024'.")
            }
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Format a library error for the terminal, including its suggestion.
#[must_use]
pub fn format_tapi_error(err: &TapiError) -> String {
    let suggestions: Vec<&str> = err.suggestion().into_iter().collect();
    format_error(&err.to_string(), "", &suggestions)
}

/// Valid config keys accepted by `tapi config`.
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "cache.tweet_ttl_secs",
    "cache.response_ttl_secs",
    "cache.merged_ttl_secs",
    "api.default_count",
    "api.include_rts",
    "render.base_url",
    "render.new_tab",
    "render.nofollow",
    "output.format",
    "output.colors",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TapiError::not_found("1234");
        assert!(err.to_string().contains("1234"));
        assert!(err.is_recoverable());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_fetch_error_is_not_recoverable() {
        let err = TapiError::fetch("statuses/show/1", "401 Unauthorized");
        assert!(err.to_string().contains("statuses/show/1"));
        assert!(err.to_string().contains("401"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_entity_display() {
        let err = TapiError::malformed_entity("hashtag", "missing indices");
        assert_eq!(err.to_string(), "Malformed hashtag entity: missing indices");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TapiError = json_err.into();
        assert!(matches!(err, TapiError::Json(_)));
    }

    #[test]
    fn format_error_single_suggestion() {
        let output = format_error("Test Error", "Something went wrong", &["Try this"]);
        assert!(output.contains("Test Error"));
        assert!(output.contains("Something went wrong"));
        assert!(output.contains("Try this"));
    }

    #[test]
    fn format_error_multiple_suggestions() {
        let output = format_error("Test Error", "", &["First option", "Second option"]);
        assert!(output.contains("First option"));
        assert!(output.contains("Second option"));
    }

    #[test]
    fn format_tapi_error_includes_hint() {
        let output = format_tapi_error(&TapiError::Unverified);
        assert!(output.contains("no verified tweet record"));
        assert!(output.contains("Wrap a tweet object"));
    }
}
