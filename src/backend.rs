use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::session::Message;
use crate::settings::Settings;

const USER_AGENT: &str = concat!("llm-playground/", env!("CARGO_PKG_VERSION"));

/// Outbound body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub settings: Settings,
    pub conversation_history: Vec<Message>,
}

/// Response body of `POST /api/chat`, successful or not.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatEnvelope {
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

#[cfg(test)]
impl ChatEnvelope {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
            error_type: None,
        }
    }

    pub fn failure(error: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
            error_type: Some(error_type.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    /// Model id -> provider name.
    pub models: BTreeMap<String, String>,
    #[serde(default)]
    pub available_providers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub available_providers: Vec<String>,
    #[serde(default)]
    pub supported_models: Vec<String>,
}

/// Something that can perform one chat exchange.
pub trait ChatBackend: Send + Sync {
    fn send(&self, request: &ChatRequest) -> Result<ChatEnvelope, BackendError>;

    /// Human-readable location, for messages and logs.
    fn endpoint(&self) -> String;
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// Blocking JSON client for the playground backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    /// `timeout` of `None` disables the request timeout entirely; the
    /// blocking client would otherwise cut every call off at 30s.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn fetch_models(&self) -> Result<ModelsResponse, BackendError> {
        let resp = self.client.get(self.url("/api/models")).send()?;
        if !resp.status().is_success() {
            return Err(BackendError::Processing(format!("API error: {}", resp.status())));
        }
        Ok(resp.json::<ModelsResponse>()?)
    }

    pub fn health(&self) -> Result<HealthResponse, BackendError> {
        let resp = self.client.get(self.url("/health")).send()?;
        if !resp.status().is_success() {
            return Err(BackendError::Processing(format!("API error: {}", resp.status())));
        }
        Ok(resp.json::<HealthResponse>()?)
    }
}

impl ChatBackend for HttpBackend {
    fn send(&self, request: &ChatRequest) -> Result<ChatEnvelope, BackendError> {
        let url = self.url("/api/chat");
        tracing::debug!(%url, model = %request.model, turns = request.conversation_history.len(), "POST chat");

        let resp = self.client.post(&url).json(request).send()?;
        let status = resp.status();
        let body = resp.text()?;

        // Error statuses still carry an envelope; only fall back to the
        // status line when the body is not one.
        match serde_json::from_str::<ChatEnvelope>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => {
                Err(BackendError::Processing(format!("Parse error: {}", e)))
            }
            Err(_) => Err(BackendError::Processing(format!(
                "API error: {} {}",
                status,
                body.chars().take(200).collect::<String>()
            ))),
        }
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    #[test]
    fn request_wire_format() {
        let req = ChatRequest {
            message: "Hello".into(),
            model: "gpt-4o".into(),
            settings: Settings::default(),
            conversation_history: Vec::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["message"], "Hello");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["settings"]["maxTokens"], 2048);
        assert_eq!(json["conversation_history"], serde_json::json!([]));
    }

    #[test]
    fn parses_success_envelope_with_extra_fields() {
        let env: ChatEnvelope = serde_json::from_str(
            r#"{"success":true,"response":"Hi!","model":"gpt-4o","provider":"openai"}"#,
        )
        .unwrap();
        assert_eq!(env, ChatEnvelope::ok("Hi!"));
    }

    #[test]
    fn parses_failure_envelope() {
        let env: ChatEnvelope = serde_json::from_str(
            r#"{"success":false,"error":"bad model","error_type":"validation_error"}"#,
        )
        .unwrap();
        assert_eq!(env, ChatEnvelope::failure("bad model", "validation_error"));
    }

    #[test]
    fn parses_models_listing() {
        let models: ModelsResponse = serde_json::from_str(
            r#"{"models":{"gpt-4o":"openai","grok-2":"groq"},"available_providers":["openai"]}"#,
        )
        .unwrap();
        assert_eq!(models.models.get("grok-2").map(String::as_str), Some("groq"));
        assert_eq!(models.available_providers, vec!["openai".to_string()]);
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:5001/", None).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5001");
        assert_eq!(backend.url("/health"), "http://localhost:5001/health");
    }

    fn ping() -> ChatRequest {
        ChatRequest {
            message: "ping".into(),
            model: "gpt-4o".into(),
            settings: Settings::default(),
            conversation_history: Vec::new(),
        }
    }

    /// Serve one canned HTTP response on an ephemeral port after `delay`.
    /// Returns the base URL.
    fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });
        format!("http://{}", addr)
    }

    /// Consume headers and a Content-Length body.
    fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    #[test]
    fn error_status_with_envelope_is_parsed() {
        let url = serve_once(
            "400 Bad Request",
            r#"{"success":false,"error":"Unsupported model","error_type":"validation_error"}"#,
            Duration::ZERO,
        );
        let backend = HttpBackend::new(&url, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(
            backend.send(&ping()),
            Ok(ChatEnvelope::failure("Unsupported model", "validation_error"))
        );
    }

    #[test]
    fn non_json_error_status_carries_status_text() {
        let url = serve_once(
            "429 Too Many Requests",
            "<html><body>slow down</body></html>",
            Duration::ZERO,
        );
        let backend = HttpBackend::new(&url, Some(Duration::from_secs(5))).unwrap();
        let result = backend.send(&ping());
        match &result {
            Err(BackendError::Processing(detail)) => {
                assert!(detail.starts_with("API error: 429"), "{}", detail)
            }
            other => panic!("expected processing error, got {:?}", other),
        }
        assert_eq!(
            crate::pipeline::classify(result).error_kind(),
            Some(crate::pipeline::ErrorKind::RateLimit)
        );
    }

    #[test]
    fn undecodable_success_body_is_a_parse_error() {
        let url = serve_once("200 OK", "definitely not json", Duration::ZERO);
        let backend = HttpBackend::new(&url, Some(Duration::from_secs(5))).unwrap();
        match backend.send(&ping()) {
            Err(BackendError::Processing(detail)) => {
                assert!(detail.starts_with("Parse error"), "{}", detail)
            }
            other => panic!("expected processing error, got {:?}", other),
        }
    }

    #[test]
    fn configured_timeout_is_a_transport_error() {
        let url = serve_once("200 OK", r#"{"success":true,"response":"late"}"#, Duration::from_secs(3));
        let backend = HttpBackend::new(&url, Some(Duration::from_millis(200))).unwrap();
        assert!(matches!(backend.send(&ping()), Err(BackendError::Transport(_))));
    }

    #[test]
    fn no_timeout_waits_past_the_client_default() {
        // The blocking client's built-in limit is 30s.
        let url = serve_once(
            "200 OK",
            r#"{"success":true,"response":"slow but fine"}"#,
            Duration::from_secs(31),
        );
        let backend = HttpBackend::new(&url, None).unwrap();
        assert_eq!(backend.send(&ping()), Ok(ChatEnvelope::ok("slow but fine")));
    }

    #[test]
    fn unreachable_backend_is_a_transport_error() {
        // Bind then drop so the port is known to be closed.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}", port);
        let backend = HttpBackend::new(&url, Some(Duration::from_secs(2))).unwrap();
        match backend.send(&ping()) {
            Err(BackendError::Transport(_)) => {}
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
