use super::router::Operation;
use super::types::*;
use crate::services::ObjectStore;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const MASKS_PREFIX: &str = "masks/";
pub const IMAGES_PREFIX: &str = "images/";
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Decode standard base64, tolerating a `data:<mime>;base64,` prefix
pub fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>, ApiError> {
    let raw = match data.split_once(";base64,") {
        Some((head, tail)) if head.starts_with("data:") => tail,
        _ => data,
    };
    general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| ApiError::InvalidBody(format!("{field} is not valid base64: {e}")))
}

pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "glb" => "model/gltf-binary",
        "gltf" => "model/gltf+json",
        "json" => "application/json",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

fn validate_extension(ext: &str) -> Result<(), ApiError> {
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::InvalidBody(format!("unusable file extension: {ext:?}")));
    }
    Ok(())
}

/// POST /v1/image/{userId}
pub struct UploadImage {
    store: Arc<dyn ObjectStore>,
}

impl UploadImage {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation for UploadImage {
    async fn execute(&self, req: &Request) -> OperationResult {
        let user_id = req.path_param("userId")?;
        let image_data = req.body_str("imageData")?;
        let ext = match req.optional_body_str("fileExtension")?.map(normalize_extension) {
            Some(ext) if !ext.is_empty() => ext,
            _ => DEFAULT_IMAGE_EXTENSION.to_string(),
        };
        validate_extension(&ext)?;

        let bytes = decode_base64("imageData", image_data)?;
        let key = format!("{IMAGES_PREFIX}{user_id}/{}.{ext}", Uuid::new_v4());
        self.store
            .put_object(&key, bytes, content_type_for(&ext))
            .await?;

        let event = json!({ "imageUrl": self.store.object_url(&key) });
        Ok(Outcome::Forward(OutboundMessage::new(
            req,
            user_id,
            self.request_type(),
            event,
        )))
    }

    fn request_type(&self) -> RequestType {
        RequestType::UploadImage
    }
}

/// POST /v1/feature/{userId}; the feature name is passed through unchecked
pub struct FeatureChange;

#[async_trait]
impl Operation for FeatureChange {
    async fn execute(&self, req: &Request) -> OperationResult {
        let user_id = req.path_param("userId")?;
        let feature = req.body_field("feature")?;
        let feature_param = req.body_field("featureParam")?;

        let event = json!({ "feature": feature, "featureParam": feature_param });
        Ok(Outcome::Forward(OutboundMessage::new(
            req,
            user_id,
            self.request_type(),
            event,
        )))
    }

    fn request_type(&self) -> RequestType {
        RequestType::FeatureChange
    }
}

/// GET /v1/user/{userId}
pub struct GetUserData;

#[async_trait]
impl Operation for GetUserData {
    async fn execute(&self, req: &Request) -> OperationResult {
        let user_id = req.path_param("userId")?;
        if !req.body_is_empty() {
            return Err(ApiError::InvalidBody(
                "get-user-data does not accept a body".into(),
            ));
        }
        Ok(Outcome::Forward(OutboundMessage::new(
            req,
            user_id,
            self.request_type(),
            json!({}),
        )))
    }

    fn request_type(&self) -> RequestType {
        RequestType::GetUserData
    }
}

/// POST /v1/mask; answered directly, never forwarded
pub struct UploadMask {
    store: Arc<dyn ObjectStore>,
}

impl UploadMask {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation for UploadMask {
    async fn execute(&self, req: &Request) -> OperationResult {
        let file_data = req.body_str("fileData")?;
        let ext = normalize_extension(req.body_str("fileExtension")?);
        let file_name = req.body_str("fileName")?;

        validate_extension(&ext)?;
        if matches!(file_name, "" | "." | "..") || file_name.contains(['/', '\\']) {
            return Err(ApiError::InvalidBody(format!("unusable file name: {file_name:?}")));
        }

        let bytes = decode_base64("fileData", file_data)?;
        let key = format!("{MASKS_PREFIX}{file_name}.{ext}");
        self.store
            .put_object(&key, bytes, content_type_for(&ext))
            .await?;

        Ok(Outcome::Respond(Response::ok(json!({
            "message": "File uploaded successfully",
            "fileUrl": self.store.object_url(&key),
        }))))
    }

    fn request_type(&self) -> RequestType {
        RequestType::UploadMask
    }
}

/// GET /v1/mask; answered directly, never forwarded
pub struct DownloadMasks {
    store: Arc<dyn ObjectStore>,
}

impl DownloadMasks {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation for DownloadMasks {
    async fn execute(&self, req: &Request) -> OperationResult {
        if !req.body_is_empty() {
            return Err(ApiError::InvalidBody(
                "download-masks does not accept a body".into(),
            ));
        }

        let urls: Vec<String> = self
            .store
            .list_objects(MASKS_PREFIX)
            .await?
            .into_iter()
            // skip the bare folder marker
            .filter(|key| key.as_str() != MASKS_PREFIX)
            .map(|key| self.store.object_url(&key))
            .collect();

        let body = if urls.is_empty() {
            json!({ "message": "No masks found", "masksUrls": [] })
        } else {
            json!({ "masksUrls": urls })
        };
        Ok(Outcome::Respond(Response::ok(body)))
    }

    fn request_type(&self) -> RequestType {
        RequestType::DownloadMasks
    }
}
