use super::types::{ErrorEvent, HandlerError, Severity};
use async_trait::async_trait;

pub const ERROR_LOG_TARGET: &str = "avatar_relay::errors";

#[async_trait]
pub trait ErrorLogger: Send + Sync {
    async fn log_error(&self, evt: ErrorEvent) -> Result<(), HandlerError>;
}

/// Writes each event as one JSON line through the `log` facade
pub struct StructuredErrorLogger {
    max_message_len: usize,
}

impl StructuredErrorLogger {
    pub fn new(max_message_len: usize) -> Self {
        Self { max_message_len }
    }

    /// Sanitized, redacted JSON line for an event
    pub fn render(&self, mut evt: ErrorEvent) -> Result<String, HandlerError> {
        if evt.message.is_empty() {
            return Err(HandlerError::Validation("Empty message".into()));
        }
        evt.sanitize_and_truncate_message(self.max_message_len);
        evt.redact_sensitive_data();
        Ok(serde_json::to_string(&evt)?)
    }
}

#[async_trait]
impl ErrorLogger for StructuredErrorLogger {
    async fn log_error(&self, evt: ErrorEvent) -> Result<(), HandlerError> {
        let severity = evt.severity;
        let line = self.render(evt)?;
        match severity {
            Severity::ES | Severity::EM => log::error!(target: ERROR_LOG_TARGET, "{}", line),
            Severity::WS | Severity::WM => log::warn!(target: ERROR_LOG_TARGET, "{}", line),
        }
        Ok(())
    }
}
