//! Formatter configuration: the plain [`GptConfig`] struct and its env loader.

pub mod default_config;
pub mod gpt_config;
