//! Default GPT config loaded from environment variables.
//!
//! Every variable is optional; missing values fall back to the defaults below.
//! Only malformed values are rejected.
//!
//! # Environment variables
//!
//! - `GPT_ENABLED`         = master switch (`1`, `true`, `yes`, `on`), default off
//! - `GPT_API_KEY`         = bearer token, default empty
//! - `GPT_API_BASE`        = API base URL, default [`DEFAULT_API_BASE`]
//! - `GPT_MODEL`           = model id, default [`DEFAULT_MODEL`]
//! - `GPT_TEMPERATURE`     = `0.0..=2.0`, default [`DEFAULT_TEMPERATURE`]
//! - `GPT_SYSTEM_PROMPT`   = system message, default [`DEFAULT_SYSTEM_PROMPT`]
//! - `GPT_TIMEOUT_SECONDS` = request timeout in seconds (fractions allowed), default [`DEFAULT_TIMEOUT_SECS`]

use crate::{
    config::gpt_config::GptConfig,
    error_handler::{
        Result, parse_flag, parse_opt_f64, validate_http_endpoint, validate_range_f64,
    },
};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_SYSTEM_PROMPT: &str = "Ты помощник по недвижимости. Пиши кратко, дружелюбно и по делу, \
     не выдумывай фактов, которых нет в данных объявления.";

impl GptConfig {
    /// Builds the config from process environment.
    ///
    /// # Errors
    /// See [`GptConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary `name -> value` lookup.
    ///
    /// Empty strings count as unset for the defaulted fields.
    ///
    /// # Errors
    /// - `ConfigError::InvalidNumber` if `GPT_TEMPERATURE` or `GPT_TIMEOUT_SECONDS` do not parse
    /// - `ConfigError::OutOfRange` if the temperature is outside `0.0..=2.0`, or the
    ///   timeout is not a positive, finite number of seconds
    /// - `ConfigError::InvalidFormat` if formatting is enabled and `GPT_API_BASE` is not http(s)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled = parse_flag(lookup("GPT_ENABLED"));
        let api_key = lookup("GPT_API_KEY").unwrap_or_default().trim().to_string();
        let api_base = non_empty("GPT_API_BASE")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_empty("GPT_MODEL")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let system_prompt =
            non_empty("GPT_SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let temperature = parse_opt_f64("GPT_TEMPERATURE", lookup("GPT_TEMPERATURE"))?
            .unwrap_or(DEFAULT_TEMPERATURE);
        validate_range_f64("temperature", temperature, 0.0, 2.0)?;

        let timeout_secs = parse_opt_f64("GPT_TIMEOUT_SECONDS", lookup("GPT_TIMEOUT_SECONDS"))?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        // A disabled formatter never touches the base URL.
        if enabled {
            validate_http_endpoint("GPT_API_BASE", &api_base)?;
        }

        let cfg = GptConfig {
            enabled,
            api_key,
            api_base,
            model,
            temperature,
            system_prompt,
            timeout_secs,
        };
        cfg.timeout()?;
        Ok(cfg)
    }
}
