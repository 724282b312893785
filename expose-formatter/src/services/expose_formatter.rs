//! GPT-powered expose formatter with a fail-safe fallback.
//!
//! [`ExposeFormatter::format`] turns a listing into a short summary through a
//! chat-completion API. Remote problems never reach the caller: a non-200
//! status, a network failure or a response without content is logged at WARN
//! and the caller's fallback text is returned instead.
//!
//! # Examples
//!
//! ```no_run
//! use expose_formatter::{ExposeFormatter, GptConfig};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let formatter = ExposeFormatter::new(GptConfig::from_env()?)?;
//!
//! let expose = json!({"title": "2-room flat", "price": "950 €", "url": "https://example.com/1"});
//! let text = formatter
//!     .format(expose.as_object().unwrap(), "2-room flat, 950 €")
//!     .await?;
//! println!("{text}");
//! # Ok(()) }
//! ```

use reqwest::StatusCode;
use tracing::warn;

use crate::{
    config::gpt_config::GptConfig,
    error_handler::{FormatterError, Result, make_snippet},
    payload::{ChatCompletionResponse, Expose, build_payload},
    services::transport::{ChatHttpRequest, ChatTransport, ReqwestTransport},
};

/// Formats exposes with a chat-completion model.
///
/// Holds an immutable [`GptConfig`] and a transport. Stateless across calls,
/// so one instance can be shared (`Arc`) between tasks.
#[derive(Debug)]
pub struct ExposeFormatter<T = ReqwestTransport> {
    cfg: GptConfig,
    transport: T,
    url_chat: String,
}

impl ExposeFormatter<ReqwestTransport> {
    /// Creates a formatter using the production HTTP transport.
    ///
    /// Configuration content is not validated here; an empty key or model
    /// only disables remote formatting.
    ///
    /// # Errors
    /// Returns [`FormatterError::ClientInit`] if the HTTP client cannot be built.
    pub fn new(cfg: GptConfig) -> Result<Self> {
        Ok(Self::with_transport(cfg, ReqwestTransport::new()?))
    }
}

impl<T: ChatTransport> ExposeFormatter<T> {
    /// Creates a formatter with a custom transport.
    pub fn with_transport(cfg: GptConfig, transport: T) -> Self {
        let url_chat = cfg.chat_completions_url();
        Self {
            cfg,
            transport,
            url_chat,
        }
    }

    /// Whether remote formatting will be attempted (enabled, key and model set).
    pub fn enabled(&self) -> bool {
        self.cfg.usable()
    }

    /// The configuration this formatter was built with.
    pub fn config(&self) -> &GptConfig {
        &self.cfg
    }

    /// Returns a model-written summary of `expose`, or `fallback` if remote
    /// formatting is disabled or fails.
    ///
    /// At most one request is sent; there is no retry. Failures are logged at
    /// WARN; response bodies in those log lines are cut to
    /// [`SNIPPET_MAX_CHARS`](crate::error_handler::SNIPPET_MAX_CHARS) characters.
    ///
    /// # Errors
    /// Only for caller misuse, never for remote problems:
    /// - [`FormatterError::Config`] if `timeout_secs` is not a positive, finite duration
    /// - [`FormatterError::Transport`] if the request cannot be built (e.g. the
    ///   API key is not a valid header value)
    /// - [`FormatterError::Serialize`] if the payload cannot be serialized
    pub async fn format(&self, expose: &Expose, fallback: &str) -> Result<String> {
        if !self.enabled() {
            return Ok(fallback.to_string());
        }

        let timeout = self.cfg.timeout()?;
        let body = build_payload(&self.cfg, expose)?;
        let request = ChatHttpRequest {
            url: &self.url_chat,
            api_key: &self.cfg.api_key,
            body: &body,
            timeout,
        };

        let reply = match self.transport.post_json(request).await {
            Ok(reply) => reply,
            Err(e) if e.is_network() => {
                warn!(
                    error = %e,
                    url = %self.url_chat,
                    model = %self.cfg.model,
                    "error while calling GPT API, falling back to default message"
                );
                return Ok(fallback.to_string());
            }
            Err(e) => return Err(FormatterError::from(e)),
        };

        if reply.status != StatusCode::OK {
            warn!(
                status = reply.status.as_u16(),
                url = %self.url_chat,
                body = %make_snippet(&reply.body),
                "GPT API returned {}",
                reply.status
            );
            return Ok(fallback.to_string());
        }

        let content = match serde_json::from_str::<ChatCompletionResponse>(&reply.body) {
            Ok(parsed) => parsed.first_content(),
            Err(e) => {
                warn!(
                    error = %e,
                    body = %make_snippet(&reply.body),
                    "GPT API response could not be decoded, falling back to default message"
                );
                return Ok(fallback.to_string());
            }
        };

        match content {
            Some(text) => Ok(text),
            None => {
                warn!(
                    model = %self.cfg.model,
                    "GPT API response missing content, falling back to default message"
                );
                Ok(fallback.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use serde_json::{Value, json};

    use super::*;
    use crate::{
        error_handler::{ConfigError, TransportError},
        payload::ChatCompletionRequest,
        services::transport::{
            HttpReply, TransportFuture,
            tests::{closed_addr, serve_once, serve_silent},
        },
    };

    /// Scripted reply for the fake transport.
    #[derive(Clone)]
    enum Script {
        Reply(u16, &'static str),
        Timeout,
        Connect,
        InvalidRequest,
    }

    /// What the fake transport saw on one call.
    #[derive(Debug, Clone)]
    struct SeenCall {
        url: String,
        api_key: String,
        body: ChatCompletionRequest,
        timeout: Duration,
    }

    #[derive(Clone)]
    struct FakeTransport {
        script: Script,
        calls: Arc<Mutex<Vec<SeenCall>>>,
    }

    impl FakeTransport {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<SeenCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChatTransport for FakeTransport {
        fn post_json<'a>(&'a self, request: ChatHttpRequest<'a>) -> TransportFuture<'a> {
            self.calls.lock().unwrap().push(SeenCall {
                url: request.url.to_string(),
                api_key: request.api_key.to_string(),
                body: request.body.clone(),
                timeout: request.timeout,
            });
            let url = request.url.to_string();
            let script = self.script.clone();
            Box::pin(async move {
                match script {
                    Script::Reply(code, body) => Ok(HttpReply {
                        status: StatusCode::from_u16(code).unwrap(),
                        body: body.to_string(),
                    }),
                    Script::Timeout => Err(TransportError::Timeout {
                        url,
                        timeout: request.timeout,
                    }),
                    Script::Connect => Err(TransportError::Connect {
                        url,
                        reason: "connection refused".into(),
                    }),
                    Script::InvalidRequest => {
                        Err(TransportError::InvalidRequest("bad header".into()))
                    }
                }
            })
        }
    }

    /// In-memory log sink for asserting on WARN lines.
    #[derive(Clone, Default)]
    struct LogBuf(Arc<Mutex<Vec<u8>>>);

    impl LogBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Installs a thread-local subscriber capturing everything at TRACE.
    fn capture_logs() -> (LogBuf, tracing::subscriber::DefaultGuard) {
        let buf = LogBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (buf, guard)
    }

    const OK_BODY: &str = r#"{"choices":[{"message":{"content":" Great flat! "}}]}"#;
    const FALLBACK: &str = "Neue Wohnung: 2 Zimmer, 1000 €";

    fn cfg() -> GptConfig {
        GptConfig {
            enabled: true,
            api_key: "sk-test".into(),
            api_base: "https://api.example.com/v1/".into(),
            model: "gpt-test".into(),
            temperature: 0.4,
            system_prompt: "S".into(),
            timeout_secs: 7.0,
        }
    }

    fn expose() -> Expose {
        match json!({"price": 1000, "rooms": 2, "url": "https://example.com/e/1"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn formatter(cfg: GptConfig, script: Script) -> (ExposeFormatter<FakeTransport>, FakeTransport) {
        let fake = FakeTransport::new(script);
        (ExposeFormatter::with_transport(cfg, fake.clone()), fake)
    }

    #[tokio::test]
    async fn closed_gate_returns_fallback_without_calling() {
        let closed = [
            GptConfig { enabled: false, ..cfg() },
            GptConfig { api_key: String::new(), ..cfg() },
            GptConfig { model: String::new(), ..cfg() },
        ];
        for c in closed {
            let (logs, _guard) = capture_logs();
            let (f, fake) = formatter(c, Script::Reply(200, OK_BODY));
            assert!(!f.enabled());
            assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
            assert!(fake.calls().is_empty());
            assert!(logs.text().is_empty());
        }
    }

    #[tokio::test]
    async fn empty_fallback_is_returned_as_is() {
        let (f, _) = formatter(GptConfig { enabled: false, ..cfg() }, Script::Timeout);
        assert_eq!(f.format(&expose(), "").await.unwrap(), "");
    }

    #[tokio::test]
    async fn success_returns_trimmed_content() {
        let (f, fake) = formatter(cfg(), Script::Reply(200, OK_BODY));
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), "Great flat!");
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn request_targets_chat_completions_with_config() {
        let (f, fake) = formatter(cfg(), Script::Reply(200, OK_BODY));
        f.format(&expose(), FALLBACK).await.unwrap();

        let calls = fake.calls();
        let call = &calls[0];
        assert_eq!(call.url, "https://api.example.com/v1/chat/completions");
        assert_eq!(call.api_key, "sk-test");
        assert_eq!(call.timeout, Duration::from_secs(7));
        assert_eq!(call.body.model, "gpt-test");
        assert_eq!(call.body.temperature, 0.4);
        assert_eq!(call.body.messages.len(), 2);
        assert_eq!(call.body.messages[0].role, "system");
        assert_eq!(call.body.messages[0].content, "S");
        assert_eq!(call.body.messages[1].role, "user");
        assert!(
            call.body.messages[1]
                .content
                .contains(&serde_json::to_string(&expose()).unwrap())
        );
    }

    #[tokio::test]
    async fn server_error_falls_back_and_warns() {
        let (logs, _guard) = capture_logs();
        let (f, fake) = formatter(cfg(), Script::Reply(500, r#"{"error":"upstream down"}"#));

        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
        assert_eq!(fake.calls().len(), 1);

        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("500"), "{text}");
        assert!(text.contains("upstream down"), "{text}");
    }

    #[tokio::test]
    async fn any_non_200_is_terminal() {
        for code in [201, 204, 301, 400, 401, 429, 503] {
            let (f, fake) = formatter(cfg(), Script::Reply(code, OK_BODY));
            assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
            assert_eq!(fake.calls().len(), 1, "no retry for {code}");
        }
    }

    #[tokio::test]
    async fn long_error_body_is_cut_in_logs() {
        let max = crate::error_handler::SNIPPET_MAX_CHARS;
        let body: &'static str =
            Box::leak(format!("{}{}", "a".repeat(max), "b".repeat(50)).into_boxed_str());
        let (logs, _guard) = capture_logs();
        let (f, _) = formatter(cfg(), Script::Reply(502, body));

        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);

        let text = logs.text();
        assert!(text.contains(&format!("{}…", "a".repeat(max))), "{text}");
        assert!(!text.contains("bb"), "{text}");
    }

    #[tokio::test]
    async fn timeout_falls_back_and_warns() {
        let (logs, _guard) = capture_logs();
        let (f, _) = formatter(cfg(), Script::Timeout);

        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("timed out"), "{text}");
    }

    #[tokio::test]
    async fn connection_failure_falls_back() {
        let (f, _) = formatter(cfg(), Script::Connect);
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
    }

    #[tokio::test]
    async fn invalid_request_propagates() {
        let (f, _) = formatter(cfg(), Script::InvalidRequest);
        let err = f.format(&expose(), FALLBACK).await.unwrap_err();
        assert!(matches!(
            err,
            FormatterError::Transport(TransportError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn missing_or_empty_content_falls_back() {
        let bodies = [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"message":{"content":""}}]}"#,
            r#"{"id":"chatcmpl-1"}"#,
            "not json at all",
        ];
        for body in bodies {
            let (logs, _guard) = capture_logs();
            let (f, _) = formatter(cfg(), Script::Reply(200, body));
            assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK, "{body}");
            assert!(logs.text().contains("WARN"), "{body}");
        }
    }

    #[tokio::test]
    async fn whitespace_only_content_returns_empty_text() {
        let (logs, _guard) = capture_logs();
        let (f, _) = formatter(
            cfg(),
            Script::Reply(200, r#"{"choices":[{"message":{"content":"  "}}]}"#),
        );
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), "");
        assert!(logs.text().is_empty());
    }

    #[tokio::test]
    async fn fractional_timeout_reaches_transport() {
        let (f, fake) = formatter(
            GptConfig { timeout_secs: 2.5, ..cfg() },
            Script::Reply(200, OK_BODY),
        );
        f.format(&expose(), FALLBACK).await.unwrap();
        assert_eq!(fake.calls()[0].timeout, Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn unusable_timeout_propagates_without_calling() {
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let (f, fake) = formatter(
                GptConfig { timeout_secs: secs, ..cfg() },
                Script::Reply(200, OK_BODY),
            );
            let err = f.format(&expose(), FALLBACK).await.unwrap_err();
            assert!(
                matches!(
                    err,
                    FormatterError::Config(ConfigError::OutOfRange { field: "timeout_secs", .. })
                ),
                "{secs}"
            );
            assert!(fake.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn disabled_formatter_ignores_timeout() {
        let (f, _) = formatter(
            GptConfig { enabled: false, timeout_secs: -1.0, ..cfg() },
            Script::Timeout,
        );
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
    }

    #[tokio::test]
    async fn enabled_does_not_touch_network() {
        let (f, fake) = formatter(cfg(), Script::Timeout);
        assert!(f.enabled());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let (f, fake) = formatter(cfg(), Script::Reply(200, OK_BODY));
        let first = f.format(&expose(), FALLBACK).await.unwrap();
        let second = f.format(&expose(), FALLBACK).await.unwrap();
        assert_eq!(first, second);

        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].body, calls[1].body);
    }

    #[tokio::test]
    async fn instances_keep_their_own_config() {
        let (on, _) = formatter(cfg(), Script::Reply(200, OK_BODY));
        let (off, _) = formatter(GptConfig { enabled: false, ..cfg() }, Script::Reply(200, OK_BODY));
        assert_eq!(on.format(&expose(), FALLBACK).await.unwrap(), "Great flat!");
        assert_eq!(off.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
    }

    /* ------------------- real reqwest transport ------------------- */

    fn http_cfg(base: &str) -> GptConfig {
        GptConfig {
            api_base: format!("{base}/v1/"),
            timeout_secs: 1.0,
            ..cfg()
        }
    }

    #[tokio::test]
    async fn http_success_end_to_end() {
        let (base, rx) = serve_once(200, OK_BODY).await;
        let f = ExposeFormatter::new(http_cfg(&base)).unwrap();

        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), "Great flat!");

        let cap = rx.await.unwrap();
        assert!(cap.head.starts_with("POST /v1/chat/completions HTTP/1.1"));
        assert!(cap.head.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        let sent: Value = serde_json::from_str(&cap.body).unwrap();
        assert_eq!(sent["model"], "gpt-test");
        assert_eq!(sent["messages"][0], json!({"role": "system", "content": "S"}));
    }

    #[tokio::test]
    async fn http_server_error_end_to_end() {
        let (base, _rx) = serve_once(500, r#"{"error":"boom"}"#).await;
        let f = ExposeFormatter::new(http_cfg(&base)).unwrap();
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
    }

    #[tokio::test]
    async fn http_timeout_end_to_end() {
        let base = serve_silent().await;
        let f = ExposeFormatter::new(http_cfg(&base)).unwrap();
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
    }

    #[tokio::test]
    async fn http_refused_end_to_end() {
        let base = closed_addr().await;
        let f = ExposeFormatter::new(http_cfg(&base)).unwrap();
        assert_eq!(f.format(&expose(), FALLBACK).await.unwrap(), FALLBACK);
    }
}
