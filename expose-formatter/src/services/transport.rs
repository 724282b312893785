//! HTTP transport for chat-completion requests.
//!
//! [`ChatTransport`] performs exactly one POST and reports the outcome as a
//! typed result: an [`HttpReply`] for any HTTP status, or a classified
//! [`TransportError`]. It never interprets the status or the body.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::{StatusCode, header};

use crate::{
    error_handler::{FormatterError, TransportError},
    payload::ChatCompletionRequest,
};

/// One outbound chat-completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatHttpRequest<'a> {
    pub url: &'a str,
    pub api_key: &'a str,
    pub body: &'a ChatCompletionRequest,
    pub timeout: Duration,
}

/// Raw HTTP reply: status and the full body text.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

/// Boxed future returned by [`ChatTransport::post_json`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpReply, TransportError>> + Send + 'a>>;

/// Transport interface for the chat-completion call.
///
/// Implement this trait to plug in another HTTP stack or a test double.
pub trait ChatTransport: Send + Sync {
    /// Sends `request` as JSON with bearer auth and returns the reply.
    fn post_json<'a>(&'a self, request: ChatHttpRequest<'a>) -> TransportFuture<'a>;
}

/// Production transport backed by a shared `reqwest::Client`.
///
/// The client is safe for concurrent use; each call issues its own request
/// with its own timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh HTTP client.
    ///
    /// # Errors
    /// Returns [`FormatterError::ClientInit`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FormatterError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(FormatterError::ClientInit)?;
        Ok(Self { client })
    }

    /// Wraps an existing client, e.g. to share its connection pool or proxy settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChatTransport for ReqwestTransport {
    fn post_json<'a>(&'a self, request: ChatHttpRequest<'a>) -> TransportFuture<'a> {
        Box::pin(async move {
            let auth = header::HeaderValue::from_str(&format!("Bearer {}", request.api_key))
                .map_err(|e| {
                    TransportError::InvalidRequest(format!("invalid API key header: {e}"))
                })?;

            let resp = self
                .client
                .post(request.url)
                .header(header::AUTHORIZATION, auth)
                .header(header::CONTENT_TYPE, "application/json")
                .timeout(request.timeout)
                .json(request.body)
                .send()
                .await
                .map_err(|e| TransportError::from_reqwest(e, request.url, request.timeout))?;

            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(e, request.url, request.timeout))?;

            Ok(HttpReply { status, body })
        })
    }
}
