use super::operations::{DownloadMasks, FeatureChange, GetUserData, UploadImage, UploadMask};
use super::types::*;
use crate::error_handler::{ErrorEvent, ErrorLogger};
use crate::services::{MessageBus, ObjectStore, QoS};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// A request handler keyed by method + resource segment
#[async_trait::async_trait]
pub trait Operation: Send + Sync {
    async fn execute(&self, req: &Request) -> OperationResult;
    fn request_type(&self) -> RequestType;
}

/// Exact-match dispatch table; one operation per key
#[derive(Default)]
pub struct ApiRouter {
    operations: HashMap<OperationKey, Arc<dyn Operation>>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five routes of the avatar API, sharing one object store
    pub fn with_default_operations(store: Arc<dyn ObjectStore>) -> Self {
        let mut router = Self::new();
        router.register(
            OperationKey::new("POST", "image"),
            Box::new(UploadImage::new(store.clone())),
        );
        router.register(OperationKey::new("POST", "feature"), Box::new(FeatureChange));
        router.register(OperationKey::new("GET", "user"), Box::new(GetUserData));
        router.register(
            OperationKey::new("GET", "mask"),
            Box::new(DownloadMasks::new(store.clone())),
        );
        router.register(
            OperationKey::new("POST", "mask"),
            Box::new(UploadMask::new(store)),
        );
        router
    }

    /// Registering an existing key replaces the earlier operation
    pub fn register(&mut self, key: OperationKey, operation: Box<dyn Operation>) {
        if self.operations.insert(key.clone(), Arc::from(operation)).is_some() {
            log::warn!("operation {} registered twice, keeping the latest", key);
        }
    }

    pub fn lookup(&self, req: &Request) -> Result<Arc<dyn Operation>, ApiError> {
        let key = OperationKey::for_request(req)?;
        self.operations
            .get(&key)
            .cloned()
            .ok_or(ApiError::UnsupportedOperation {
                method: key.method,
                resource: key.resource,
            })
    }

    pub async fn route(&self, req: &Request) -> OperationResult {
        let operation = self.lookup(req)?;
        log::info!(
            "{} {} -> {}",
            req.method,
            req.path(),
            operation.request_type()
        );
        operation.execute(req).await
    }
}

/// Top-level entrypoint: route, forward when asked, and turn every error into a 500
pub struct ApiConnector {
    router: ApiRouter,
    bus: Arc<dyn MessageBus>,
    error_logger: Arc<dyn ErrorLogger>,
    topic: String,
}

impl ApiConnector {
    pub fn new(
        router: ApiRouter,
        bus: Arc<dyn MessageBus>,
        error_logger: Arc<dyn ErrorLogger>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            router,
            bus,
            error_logger,
            topic: topic.into(),
        }
    }

    /// Validate, transform, forward if needed. Errors are returned, not shaped.
    pub async fn dispatch(&self, req: &Request) -> Result<Response, ApiError> {
        match self.router.route(req).await? {
            Outcome::Respond(response) => {
                log::debug!("{} answered directly", req.path());
                Ok(response)
            }
            Outcome::Forward(message) => {
                let payload = serde_json::to_vec(&message)?;
                let ack = self
                    .bus
                    .publish(&self.topic, QoS::AtLeastOnce, &payload)
                    .await?;
                log::info!(
                    "forwarded {} for user {} as {}",
                    message.request_type,
                    message.user_id,
                    ack.message_id
                );
                Ok(Response::ok(json!({
                    "message": format!("Message published to MQTT topic: {}", self.topic),
                    "response": ack,
                })))
            }
        }
    }

    pub async fn handle_request(&self, req: Request) -> Response {
        match self.dispatch(&req).await {
            Ok(response) => response,
            Err(e) => self.fail(&e, Some(&req)).await,
        }
    }

    /// Full invocation on a raw gateway event, returning the gateway response
    pub async fn handle_event(&self, event: &Value) -> Value {
        let response = match Request::from_gateway_event(event) {
            Ok(req) => self.handle_request(req).await,
            Err(e) => self.fail(&e, None).await,
        };
        response.to_gateway_json()
    }

    async fn fail(&self, err: &ApiError, req: Option<&Request>) -> Response {
        let evt = ErrorEvent::from_api_error(err, req);
        if let Err(log_err) = self.error_logger.log_error(evt).await {
            log::error!("could not record error event: {}", log_err);
        }
        Response::error(err.to_string())
    }
}
