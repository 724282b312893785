use std::time::Duration;

use crate::error_handler::{ConfigError, Result};

/// Configuration for GPT-powered expose formatting.
///
/// The struct is plain data: the formatter reads it and never mutates it.
/// Empty `api_key` or `model` are valid values here; they simply switch
/// remote formatting off (see [`GptConfig::usable`]).
///
/// # Fields
///
/// - `enabled`: Master switch for remote formatting.
/// - `api_key`: Bearer token sent to the chat-completion API.
/// - `api_base`: API base URL (e.g., `https://api.openai.com/v1`); a trailing `/` is ignored.
/// - `model`: Model identifier (e.g., `"gpt-4o-mini"`).
/// - `temperature`: Sampling temperature passed through unchanged.
/// - `system_prompt`: System message content, sent verbatim.
/// - `timeout_secs`: Per-request timeout in seconds; fractions allowed, must be positive.
///
/// # Examples
///
/// ```
/// use expose_formatter::GptConfig;
///
/// let cfg = GptConfig {
///     enabled: true,
///     api_key: "sk-...".to_string(),
///     api_base: "https://api.openai.com/v1".to_string(),
///     model: "gpt-4o-mini".to_string(),
///     temperature: 0.7,
///     system_prompt: "You write short listing summaries.".to_string(),
///     timeout_secs: 30.0,
/// };
/// assert!(cfg.usable());
/// assert_eq!(cfg.timeout().unwrap(), std::time::Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GptConfig {
    /// Master switch for remote formatting.
    pub enabled: bool,

    /// API key for bearer authentication.
    pub api_key: String,

    /// Base URL of the chat-completion API.
    pub api_base: String,

    /// Model identifier string.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// System prompt sent as the first chat message.
    pub system_prompt: String,

    /// Request timeout (in seconds).
    pub timeout_secs: f64,
}

impl GptConfig {
    /// `true` when remote formatting may be attempted: enabled, with a key and a model.
    pub fn usable(&self) -> bool {
        self.enabled && !self.api_key.is_empty() && !self.model.is_empty()
    }

    /// Per-request timeout as a [`Duration`].
    ///
    /// # Errors
    /// Returns [`ConfigError::OutOfRange`] if `timeout_secs` is not positive,
    /// not finite, or too large for a `Duration`.
    pub fn timeout(&self) -> Result<Duration> {
        let secs = self.timeout_secs;
        if secs > 0.0 {
            if let Ok(d) = Duration::try_from_secs_f64(secs) {
                return Ok(d);
            }
        }
        Err(ConfigError::OutOfRange {
            field: "timeout_secs",
            detail: "expected a positive, finite number of seconds",
        }
        .into())
    }

    /// Full URL of the chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}
