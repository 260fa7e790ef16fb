use crate::api_connector::{ApiError, OperationKey, Request};
use crate::services::UpstreamError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

/// Severity levels for events: Error Severe, Error Minor, Warning Severe, Warning Minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    ES,
    EM,
    WS,
    WM,
}

/// Where the failure surfaced: Router, Storage, Messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    R,
    S,
    M,
}

/// Actors responsible: User, Server, Network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    U,
    S,
    N,
}

pub const CODE_UNSUPPORTED_OPERATION: u32 = 1001;
pub const CODE_MISSING_FIELD: u32 = 1002;
pub const CODE_INVALID_BODY: u32 = 1003;
pub const CODE_SERIALIZATION: u32 = 1004;
pub const CODE_STORAGE: u32 = 2001;
pub const CODE_MESSAGING: u32 = 2002;
pub const CODE_IO: u32 = 2003;

const REDACTED_KEYS: [&str; 5] = ["imageData", "fileData", "password", "token", "secret"];

/// One failed invocation, as handed to the error logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub component: Component,
    pub actor: Actor,
    pub code: u32,
    pub message: String,
    pub context: Value,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

impl ErrorEvent {
    pub fn new(
        severity: Severity,
        component: Component,
        actor: Actor,
        code: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            severity,
            component,
            actor,
            code,
            message: message.into(),
            context: Value::Null,
            user_id: None,
            request_id: None,
        }
    }

    /// Classify an API error; bad input is a minor user warning, upstream failures are severe
    pub fn from_api_error(err: &ApiError, req: Option<&Request>) -> Self {
        let (severity, component, actor, code) = match err {
            ApiError::UnsupportedOperation { .. } => {
                (Severity::WM, Component::R, Actor::U, CODE_UNSUPPORTED_OPERATION)
            }
            ApiError::MissingField(_) => (Severity::WM, Component::R, Actor::U, CODE_MISSING_FIELD),
            ApiError::InvalidBody(_) => (Severity::WM, Component::R, Actor::U, CODE_INVALID_BODY),
            ApiError::Json(_) => (Severity::EM, Component::R, Actor::S, CODE_SERIALIZATION),
            ApiError::Upstream(UpstreamError::Storage(_)) => {
                (Severity::ES, Component::S, Actor::N, CODE_STORAGE)
            }
            ApiError::Upstream(UpstreamError::Messaging(_)) => {
                (Severity::ES, Component::M, Actor::N, CODE_MESSAGING)
            }
            ApiError::Upstream(UpstreamError::Io(_)) => (Severity::ES, Component::S, Actor::S, CODE_IO),
        };

        let mut evt = ErrorEvent::new(severity, component, actor, code, err.to_string());
        if let Some(req) = req {
            let key = OperationKey::for_request(req)
                .map(|k| k.to_string())
                .unwrap_or_default();
            evt.context = json!({
                "method": req.method,
                "path": req.path(),
                "operation": key,
                "body": req.body,
            });
            evt.user_id = req.path_parameters.get("userId").cloned();
            evt.request_id = req.request_id.clone();
        }
        evt
    }

    /// Sanitize and truncate the message to prevent log injection
    pub fn sanitize_and_truncate_message(&mut self, max_len: usize) {
        let sanitized = self
            .message
            .replace(['\n', '\r', '\t'], " ")
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>();
        self.message = sanitized.chars().take(max_len).collect();
    }

    /// Replace payload blobs and secrets in the context
    pub fn redact_sensitive_data(&mut self) {
        fn redact_value(val: &mut Value) {
            match val {
                Value::Object(map) => {
                    for (k, v) in map.iter_mut() {
                        if REDACTED_KEYS.contains(&k.as_str()) {
                            *v = Value::String("***REDACTED***".to_string());
                        } else {
                            redact_value(v);
                        }
                    }
                }
                Value::Array(arr) => {
                    for v in arr.iter_mut() {
                        redact_value(v);
                    }
                }
                _ => {}
            }
        }
        redact_value(&mut self.context);
    }
}

/// Errors returned by an error logger
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
