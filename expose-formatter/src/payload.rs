//! Chat-completion payloads: request construction and response extraction.
//!
//! The request shape is fixed: `{model, temperature, messages: [system, user]}`.
//! The user message wraps the serialized expose in a fixed Russian instruction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{config::gpt_config::GptConfig, error_handler::Result};

/// A listing record as an opaque JSON object.
pub type Expose = Map<String, Value>;

/// Fixed instruction placed before the expose JSON in the user message.
pub const USER_INSTRUCTION: &str = "Проанализируй следующую информацию об объявлении и составь краткий, \
     чёткий текст на русском языке. Сделай акцент на ключевых выгодах, \
     укажи цену, район/адрес, количество комнат, площадь и добавь ссылку. \
     Ответ должен занимать не более 6-7 предложений.";

/// Header line introducing the serialized expose.
pub const EXPOSE_HEADER: &str = "Данные объявления (JSON):";

/// Request body for `/chat/completions` (non-streaming).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<ChatMessage>,
}

/// Chat message for the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// `"system"` or `"user"`.
    pub role: &'static str,
    pub content: String,
}

/// Builds the request body for one expose.
///
/// # Errors
/// Returns `FormatterError::Serialize` if the expose cannot be serialized.
pub fn build_payload(cfg: &GptConfig, expose: &Expose) -> Result<ChatCompletionRequest> {
    // serde_json leaves non-ASCII characters unescaped.
    let expose_json = serde_json::to_string(expose)?;
    let user_content = format!("{USER_INSTRUCTION}\n\n{EXPOSE_HEADER}\n{expose_json}");

    Ok(ChatCompletionRequest {
        model: cfg.model.clone(),
        temperature: cfg.temperature,
        messages: vec![
            ChatMessage {
                role: "system",
                content: cfg.system_prompt.clone(),
            },
            ChatMessage {
                role: "user",
                content: user_content,
            },
        ],
    })
}

/// Minimal response for `/chat/completions`.
///
/// Every level is optional so that a missing key decodes to an empty value
/// instead of failing.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessageOut>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatMessageOut {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// Trimmed `choices[0].message.content`, or `None` if any level is missing
    /// or the content is empty.
    ///
    /// Emptiness is checked before trimming: whitespace-only content yields `Some("")`.
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim().to_string())
    }
}
