use crate::services::UpstreamError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Leading path segment every routable request must carry
pub const API_VERSION: &str = "v1";

/// One inbound HTTP-style invocation. Built once, never mutated by operations.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: String,
    pub resource_path: Vec<String>,
    pub path_parameters: HashMap<String, String>,
    pub body: Value,
    pub request_id: Option<String>,
}

impl Request {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            resource_path: split_path(path),
            path_parameters: HashMap::new(),
            body: Value::Null,
            request_id: None,
        }
    }

    pub fn with_path_param(mut self, name: &str, value: &str) -> Self {
        self.path_parameters.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_request_id(mut self, id: &str) -> Self {
        self.request_id = Some(id.to_string());
        self
    }

    /// Parse an API-Gateway style proxy event.
    ///
    /// The route comes from `requestContext.path` (it keeps the stage, e.g.
    /// `/v1/mask`), then `path`, then `resource`. A string `body` is decoded as
    /// JSON and an empty string counts as no body.
    pub fn from_gateway_event(event: &Value) -> Result<Self, ApiError> {
        let method = event
            .get("httpMethod")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::InvalidBody("event is missing httpMethod".into()))?;
        let path = event
            .pointer("/requestContext/path")
            .and_then(Value::as_str)
            .or_else(|| event.get("path").and_then(Value::as_str))
            .or_else(|| event.get("resource").and_then(Value::as_str))
            .unwrap_or("");

        let mut request = Request::new(method, path);

        if let Some(params) = event.get("pathParameters").and_then(Value::as_object) {
            for (k, v) in params {
                if let Some(s) = v.as_str() {
                    request.path_parameters.insert(k.clone(), s.to_string());
                }
            }
        }

        request.body = match event.get("body") {
            None | Some(Value::Null) => Value::Null,
            Some(Value::String(raw)) if raw.trim().is_empty() => Value::Null,
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map_err(|e| ApiError::InvalidBody(format!("body is not valid JSON: {e}")))?,
            Some(other) => other.clone(),
        };

        request.request_id = event
            .pointer("/requestContext/requestId")
            .and_then(Value::as_str)
            .map(String::from);

        Ok(request)
    }

    pub fn path(&self) -> String {
        format!("/{}", self.resource_path.join("/"))
    }

    pub fn path_param(&self, name: &str) -> Result<&str, ApiError> {
        match self.path_parameters.get(name) {
            Some(v) if !v.is_empty() => Ok(v.as_str()),
            _ => Err(ApiError::MissingField(format!("pathParameters.{name}"))),
        }
    }

    pub fn body_field(&self, name: &str) -> Result<&Value, ApiError> {
        match self.body.get(name) {
            Some(Value::Null) | None => Err(ApiError::MissingField(format!("body.{name}"))),
            Some(v) => Ok(v),
        }
    }

    pub fn body_str(&self, name: &str) -> Result<&str, ApiError> {
        self.body_field(name)?
            .as_str()
            .ok_or_else(|| ApiError::InvalidBody(format!("body.{name} must be a string")))
    }

    pub fn optional_body_str(&self, name: &str) -> Result<Option<&str>, ApiError> {
        match self.body.get(name) {
            Some(Value::Null) | None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ApiError::InvalidBody(format!("body.{name} must be a string"))),
        }
    }

    /// `null`, `{}` and `""` all count as empty
    pub fn body_is_empty(&self) -> bool {
        match &self.body {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Registry key: HTTP method plus the resource segment following `v1`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub method: String,
    pub resource: String,
}

impl OperationKey {
    pub fn new(method: &str, resource: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            resource: resource.to_string(),
        }
    }

    pub fn for_request(req: &Request) -> Result<Self, ApiError> {
        match req.resource_path.as_slice() {
            [version, resource, ..] if version == API_VERSION => {
                Ok(OperationKey::new(&req.method, resource))
            }
            _ => Err(ApiError::UnsupportedOperation {
                method: req.method.clone(),
                resource: req.path(),
            }),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.resource)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    UploadImage,
    FeatureChange,
    GetUserData,
    UploadMask,
    DownloadMasks,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::UploadImage => "upload-image",
            RequestType::FeatureChange => "feature-change",
            RequestType::GetUserData => "get-user-data",
            RequestType::UploadMask => "upload-mask",
            RequestType::DownloadMasks => "download-masks",
        };
        f.write_str(name)
    }
}

/// Normalized payload published to the message bus
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub user_id: String,
    pub request_type: RequestType,
    pub event: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl OutboundMessage {
    pub fn new(req: &Request, user_id: &str, request_type: RequestType, event: Value) -> Self {
        Self {
            user_id: user_id.to_string(),
            request_type,
            event,
            request_id: req.request_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: Value,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self { status_code: 200, body }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            status_code: 500,
            body: json!({ "error": message }),
        }
    }

    /// Proxy-integration shape: body is a JSON string
    pub fn to_gateway_json(&self) -> Value {
        let mut headers = Map::new();
        headers.insert("Content-Type".into(), Value::String("application/json".into()));
        json!({
            "statusCode": self.status_code,
            "headers": headers,
            "body": self.body.to_string(),
        })
    }
}

/// What a successful operation produced: exactly one of the two
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Forward(OutboundMessage),
    Respond(Response),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MissingField,
    InvalidBody,
    UnsupportedOperation,
    UpstreamService,
    Internal,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid body: {0}")]
    InvalidBody(String),
    #[error("unsupported operation: {method} {resource}")]
    UnsupportedOperation { method: String, resource: String },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingField(_) => ErrorKind::MissingField,
            ApiError::InvalidBody(_) => ErrorKind::InvalidBody,
            ApiError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            ApiError::Upstream(_) => ErrorKind::UpstreamService,
            ApiError::Json(_) => ErrorKind::Internal,
        }
    }
}

pub type OperationResult = Result<Outcome, ApiError>;
