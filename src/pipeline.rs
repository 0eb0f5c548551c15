use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::backend::{ChatBackend, ChatEnvelope, ChatRequest};
use crate::error::BackendError;
use crate::session::{ConversationSession, Sender};
use crate::settings::SettingsStore;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Every way an exchange can fail, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectionError,
    ValidationError,
    ProviderUnavailable,
    ServerError,
    RateLimit,
    AuthError,
    GenericError,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::ConnectionError => "Connection Error",
            ErrorKind::ValidationError => "Validation Error",
            ErrorKind::ProviderUnavailable => "Provider Unavailable",
            ErrorKind::ServerError => "Server Error",
            ErrorKind::RateLimit => "Rate Limit",
            ErrorKind::AuthError => "Authentication Error",
            ErrorKind::GenericError => "Error",
        }
    }
}

/// What an exchange resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Reply(String),
    Failed {
        kind: ErrorKind,
        /// Text appended to the conversation.
        message: String,
        /// Raw cause, for the diagnostic log only.
        detail: String,
    },
}

impl ExchangeOutcome {
    /// The assistant message this outcome becomes.
    pub fn text(&self) -> &str {
        match self {
            ExchangeOutcome::Reply(text) => text,
            ExchangeOutcome::Failed { message, .. } => message,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ExchangeOutcome::Reply(_) => None,
            ExchangeOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

const RATE_LIMIT_SIGNALS: &[&str] = &["rate limit", "too many requests"];
const AUTH_SIGNALS: &[&str] = &["unauthorized", "api key", "authentication"];

/// Prefix `HttpBackend::send` puts before a non-2xx status.
const STATUS_PREFIX: &str = "API error: ";

/// HTTP status carried by a processing error, if it has one. Only the
/// token right after the prefix counts, so numbers elsewhere in a
/// message never look like a status.
fn status_code(detail: &str) -> Option<u16> {
    detail
        .strip_prefix(STATUS_PREFIX)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

fn failed(kind: ErrorKind, message: String, detail: impl Into<String>) -> ExchangeOutcome {
    ExchangeOutcome::Failed {
        kind,
        message,
        detail: detail.into(),
    }
}

/// Map the result of one backend call to its outcome. First match wins:
/// transport failure, typed failure envelope, processing error, success.
pub fn classify(result: Result<ChatEnvelope, BackendError>) -> ExchangeOutcome {
    match result {
        Err(BackendError::Transport(detail)) => failed(
            ErrorKind::ConnectionError,
            "Connection Error: Unable to reach the backend server. \
             Please make sure it is running and try again."
                .to_string(),
            detail,
        ),
        Ok(envelope) if !envelope.success => {
            let error = envelope
                .error
                .unwrap_or_else(|| "Unknown error occurred".to_string());
            let kind = match envelope.error_type.as_deref() {
                Some("validation_error") => ErrorKind::ValidationError,
                Some("provider_unavailable") => ErrorKind::ProviderUnavailable,
                Some("server_error") => ErrorKind::ServerError,
                _ => ErrorKind::GenericError,
            };
            let message = format!("{}: {}", kind.label(), error);
            failed(kind, message, error)
        }
        Err(BackendError::Processing(detail)) => {
            let lower = detail.to_lowercase();
            let status = status_code(&detail);
            if status == Some(429) || RATE_LIMIT_SIGNALS.iter().any(|s| lower.contains(s)) {
                failed(
                    ErrorKind::RateLimit,
                    "Rate Limit: Too many requests. Please wait a moment and try again."
                        .to_string(),
                    detail,
                )
            } else if matches!(status, Some(401 | 403))
                || AUTH_SIGNALS.iter().any(|s| lower.contains(s))
            {
                failed(
                    ErrorKind::AuthError,
                    "Authentication Error: The backend rejected its API credentials. \
                     Please check the API key configuration."
                        .to_string(),
                    detail,
                )
            } else {
                failed(
                    ErrorKind::GenericError,
                    "Error: Something went wrong while processing your request. \
                     Please try again."
                        .to_string(),
                    detail,
                )
            }
        }
        Ok(envelope) => match envelope.response {
            Some(text) => ExchangeOutcome::Reply(text),
            None => failed(
                ErrorKind::GenericError,
                "Error: The backend returned an empty response.".to_string(),
                "success envelope without a response field",
            ),
        },
    }
}

// ---------------------------------------------------------------------------
// MessagePipeline
// ---------------------------------------------------------------------------

/// The typing placeholder of the exchange in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExchange {
    pub placeholder_id: String,
    pub started_at: Instant,
}

/// Result of [`MessagePipeline::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submit {
    /// Whitespace-only input; nothing happened.
    Ignored,
    /// An exchange is already in flight; the input was not consumed.
    Busy,
    Dispatched {
        placeholder_id: String,
        /// This was the session's first message; run the one-time transition.
        first_message: bool,
    },
}

/// A finished exchange. Produced exactly once per dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub placeholder_id: String,
    pub outcome: ExchangeOutcome,
}

type ExchangeResult = Result<ChatEnvelope, BackendError>;

/// Turns composed text into backend exchanges, one at a time.
///
/// Composing -> Dispatching -> AwaitingResponse -> Resolved. The network call
/// runs on a worker thread; the owner polls for its result from the event
/// loop, so settings stay editable while a response is outstanding.
pub struct MessagePipeline {
    backend: Arc<dyn ChatBackend>,
    pending: Option<PendingExchange>,
    rx: Option<mpsc::Receiver<ExchangeResult>>,
    sequence: u64,
}

impl MessagePipeline {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            pending: None,
            rx: None,
            sequence: 0,
        }
    }

    pub fn pending(&self) -> Option<&PendingExchange> {
        self.pending.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn endpoint(&self) -> String {
        self.backend.endpoint()
    }

    /// Build the payload for `message` from the current settings and history.
    pub fn build_request(
        message: &str,
        store: &SettingsStore,
        session: &ConversationSession,
    ) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            model: store.model().to_string(),
            settings: store.settings().clone(),
            conversation_history: session.history().to_vec(),
        }
    }

    pub fn submit(
        &mut self,
        text: &str,
        store: &SettingsStore,
        session: &mut ConversationSession,
    ) -> Submit {
        let message = text.trim();
        if message.is_empty() {
            return Submit::Ignored;
        }
        if self.pending.is_some() {
            tracing::debug!("submit while an exchange is in flight");
            return Submit::Busy;
        }

        // History is captured before the new user message joins it.
        let request = Self::build_request(message, store, session);
        session.append(Sender::User, message);
        let first_message = session.mark_first_message_sent();

        self.sequence += 1;
        let placeholder_id = format!("typing-{}", self.sequence);
        self.pending = Some(PendingExchange {
            placeholder_id: placeholder_id.clone(),
            started_at: Instant::now(),
        });

        tracing::info!(
            placeholder = %placeholder_id,
            model = %request.model,
            history = request.conversation_history.len(),
            "dispatching exchange"
        );

        let (tx, rx) = mpsc::channel();
        self.rx = Some(rx);
        let backend = Arc::clone(&self.backend);
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| backend.send(&request)))
                .unwrap_or_else(|payload| Err(BackendError::Processing(panic_text(&payload))));
            let _ = tx.send(result);
        });

        Submit::Dispatched {
            placeholder_id,
            first_message,
        }
    }

    /// Non-blocking: resolve the pending exchange if its result has arrived.
    pub fn poll(&mut self, session: &mut ConversationSession) -> Option<Resolution> {
        let received = match self.rx.as_ref()?.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(worker_lost()),
        };
        self.resolve(received, session)
    }

    /// Block until the pending exchange resolves.
    pub fn wait(&mut self, session: &mut ConversationSession) -> Option<Resolution> {
        let received = self.rx.as_ref()?.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.resolve(received, session)
    }

    fn resolve(
        &mut self,
        result: ExchangeResult,
        session: &mut ConversationSession,
    ) -> Option<Resolution> {
        self.rx = None;
        let pending = self.pending.take()?;
        let outcome = classify(result);

        match &outcome {
            ExchangeOutcome::Reply(text) => tracing::info!(
                placeholder = %pending.placeholder_id,
                elapsed_ms = pending.started_at.elapsed().as_millis() as u64,
                chars = text.len(),
                "exchange resolved"
            ),
            ExchangeOutcome::Failed { kind, detail, .. } => tracing::error!(
                placeholder = %pending.placeholder_id,
                kind = kind.label(),
                %detail,
                "exchange failed"
            ),
        }

        session.append(Sender::Assistant, outcome.text());
        Some(Resolution {
            placeholder_id: pending.placeholder_id,
            outcome,
        })
    }
}

fn worker_lost() -> BackendError {
    BackendError::Processing("exchange worker ended without a result".to_string())
}

fn panic_text(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "exchange worker panicked".to_string()
    }
}
