//! Expose formatting through a chat-completion API.
//!
//! [`ExposeFormatter`] summarises a real-estate listing with a GPT-style model
//! and always resolves to text: when formatting is disabled or the remote call
//! fails, the caller's fallback string is returned.
//!
//! Modules:
//! - [`config`]        — [`GptConfig`] and its environment loader
//! - [`payload`]       — request construction and response extraction
//! - [`services`]      — the formatter and its HTTP transport
//! - [`error_handler`] — unified error types and config helpers
//! - [`telemetry`]     — `tracing-subscriber` layer scoped to this crate

pub mod config;
pub mod error_handler;
pub mod payload;
pub mod services;
pub mod telemetry;

pub use config::gpt_config::GptConfig;
pub use error_handler::{ConfigError, FormatterError, Result, TransportError};
pub use payload::{ChatCompletionRequest, ChatMessage, Expose, build_payload};
pub use services::expose_formatter::ExposeFormatter;
pub use services::transport::{ChatHttpRequest, ChatTransport, HttpReply, ReqwestTransport};
