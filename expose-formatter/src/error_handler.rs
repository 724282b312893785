//! Unified error handling for `expose-formatter`.
//!
//! This module exposes a single top-level error type [`FormatterError`] for the
//! whole library, and groups domain-specific errors in nested enums
//! ([`ConfigError`], [`TransportError`]). Small helpers for reading/validating
//! configuration values are provided and return the unified [`Result<T>`] alias.
//!
//! Only [`TransportError`] kinds reported by [`TransportError::is_network`] are
//! absorbed by the formatter (logged and replaced by the fallback text).
//! Everything else propagates to the caller.
//!
//! All messages include the suffix `[Expose Formatter]` to simplify attribution in logs.

use std::time::Duration;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, FormatterError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `expose-formatter` crate.
///
/// Remote problems (non-200 status, network failures, malformed responses)
/// never surface through this type from [`crate::ExposeFormatter::format`];
/// they resolve to the fallback text. What remains here is caller misuse and
/// setup failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormatterError {
    /// Configuration loading/validation errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport failure that is not a network problem (e.g. unbuildable request).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The expose or request payload could not be serialized.
    #[error("[Expose Formatter] payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("[Expose Formatter] http client init failed: {0}")]
    ClientInit(#[source] reqwest::Error),
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number failed to parse (temperature, timeout).
    #[error("[Expose Formatter] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `GPT_TIMEOUT_SECONDS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected floating-point number`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[Expose Formatter] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `GPT_API_BASE`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[Expose Formatter] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `temperature`).
        field: &'static str,
        /// Description of the expected range.
        detail: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Transport errors                                                          */
/* ------------------------------------------------------------------------- */

/// Failure of a single HTTP exchange, classified by kind.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("[Expose Formatter] request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured per-request timeout.
        timeout: Duration,
    },

    /// Connection could not be established (refused, DNS, TLS handshake).
    #[error("[Expose Formatter] connection to {url} failed: {reason}")]
    Connect {
        /// Request URL.
        url: String,
        /// Underlying error text.
        reason: String,
    },

    /// The response body could not be read.
    #[error("[Expose Formatter] failed to read response body from {url}: {reason}")]
    Body {
        /// Request URL.
        url: String,
        /// Underlying error text.
        reason: String,
    },

    /// Any other failure while the request was in flight.
    #[error("[Expose Formatter] network error for {url}: {reason}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying error text.
        reason: String,
    },

    /// The request could not be built (bad header value, malformed URL).
    #[error("[Expose Formatter] invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// `true` for failures caused by the network or the remote peer.
    ///
    /// These are the only transport errors the formatter absorbs.
    pub fn is_network(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }

    /// Classifies a `reqwest` error raised while sending `url`.
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout: Duration) -> Self {
        let url = url.to_string();
        if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else if err.is_timeout() {
            TransportError::Timeout { url, timeout }
        } else if err.is_connect() {
            TransportError::Connect {
                url,
                reason: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                url,
                reason: err.to_string(),
            }
        } else {
            TransportError::Network {
                url,
                reason: err.to_string(),
            }
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Log helpers                                                               */
/* ------------------------------------------------------------------------- */

/// Max characters of a response body kept in log lines.
pub const SNIPPET_MAX_CHARS: usize = 1024;

/// Trims a response body for logging; appends `…` when cut.
pub fn make_snippet(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/* ------------------------------------------------------------------------- */
/* Config helpers (return unified `Result<T>`)                               */
/* ------------------------------------------------------------------------- */

/// Parses an optional `f64` value (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the value is set but not a valid `f64`.
pub fn parse_opt_f64(var: &'static str, raw: Option<String>) -> Result<Option<f64>> {
    match raw {
        Some(v) if !v.trim().is_empty() => v.trim().parse::<f64>().map(Some).map_err(|_| {
            FormatterError::from(ConfigError::InvalidNumber {
                var,
                reason: "expected floating-point number",
            })
        }),
        _ => Ok(None),
    }
}

/// Returns `true` for truthy flag values ("1", "true", "yes", "on").
pub fn parse_flag(raw: Option<String>) -> bool {
    raw.map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
    .unwrap_or(false)
}

/* ------------------------------------------------------------------------- */
/* Validation helpers (return unified `Result<T>`)                           */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] when the string does not start with
/// a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Validates that a floating-point value lies within an inclusive range.
///
/// # Errors
/// Returns [`ConfigError::OutOfRange`] if `value` is outside `[min, max]` or not finite.
pub fn validate_range_f64(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        }
        .into())
    }
}
