use avatar_relay_api::api_connector::{
    DownloadMasks, ErrorKind, FeatureChange, GetUserData, Operation, Outcome, Request,
    RequestType, UploadImage, UploadMask,
};
use avatar_relay_api::services::{InMemoryObjectStore, ObjectStore};
use serde_json::json;
use std::sync::Arc;

const BASE_URL: &str = "https://avatar-assets.s3.us-east-1.amazonaws.com";

fn store() -> Arc<InMemoryObjectStore> {
    Arc::new(InMemoryObjectStore::new(BASE_URL))
}

fn image_request(user: &str, body: serde_json::Value) -> Request {
    Request::new("POST", &format!("/v1/image/{user}"))
        .with_path_param("userId", user)
        .with_body(body)
}

fn forwarded(outcome: Outcome) -> avatar_relay_api::api_connector::OutboundMessage {
    match outcome {
        Outcome::Forward(msg) => msg,
        other => panic!("expected a forwarded message, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_image_stores_bytes_and_emits_bucket_url() {
    let store = store();
    let op = UploadImage::new(store.clone());

    let req = image_request("alice", json!({"imageData": "aGVsbG8="}));
    let msg = forwarded(op.execute(&req).await.unwrap());

    assert_eq!(msg.user_id, "alice");
    assert_eq!(msg.request_type, RequestType::UploadImage);
    let url = msg.event["imageUrl"].as_str().unwrap();
    assert!(url.starts_with(&format!("{BASE_URL}/images/alice/")));
    assert!(url.ends_with(".jpg"));

    let key = url.trim_start_matches(&format!("{BASE_URL}/"));
    let stored = store.get(key).await.unwrap();
    assert_eq!(stored.bytes, b"hello");
    assert_eq!(stored.content_type, "image/jpeg");
}

#[tokio::test]
async fn upload_image_url_escapes_user_id() {
    let store = store();
    let op = UploadImage::new(store.clone());

    let req = image_request("alice smith#1", json!({"imageData": "aGk="}));
    let msg = forwarded(op.execute(&req).await.unwrap());

    let raw = msg.event["imageUrl"].as_str().unwrap();
    let url = url::Url::parse(raw).unwrap();
    assert_eq!(url.host_str(), Some("avatar-assets.s3.us-east-1.amazonaws.com"));
    assert_eq!(url.fragment(), None);
    assert_eq!(url.query(), None);

    let key = url
        .path_segments()
        .unwrap()
        .map(|s| urlencoding::decode(s).unwrap().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    assert!(key.starts_with("images/alice smith#1/"));
    assert_eq!(store.get(&key).await.unwrap().bytes, b"hi");
}

#[tokio::test]
async fn upload_image_blank_extension_falls_back_to_jpg() {
    let store = store();
    let op = UploadImage::new(store.clone());

    let req = image_request("alice", json!({"imageData": "aGk=", "fileExtension": ""}));
    let msg = forwarded(op.execute(&req).await.unwrap());

    let url = msg.event["imageUrl"].as_str().unwrap();
    assert!(url.ends_with(".jpg"));
    let key = url.trim_start_matches(&format!("{BASE_URL}/"));
    assert_eq!(store.get(key).await.unwrap().content_type, "image/jpeg");
}

#[tokio::test]
async fn upload_image_keys_are_unique() {
    let store = store();
    let op = UploadImage::new(store.clone());
    let req = image_request(
        "alice",
        json!({"imageData": "data:image/png;base64,aGk=", "fileExtension": ".png"}),
    );

    let first = forwarded(op.execute(&req).await.unwrap());
    let second = forwarded(op.execute(&req).await.unwrap());

    assert_ne!(first.event["imageUrl"], second.event["imageUrl"]);
    assert_eq!(store.len().await, 2);
    assert_eq!(
        store.list_objects("images/alice/").await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn upload_image_requires_user_and_data() {
    let store = store();
    let op = UploadImage::new(store.clone());

    let no_user = Request::new("POST", "/v1/image").with_body(json!({"imageData": "aGk="}));
    assert_eq!(
        op.execute(&no_user).await.unwrap_err().kind(),
        ErrorKind::MissingField
    );

    let no_data = image_request("alice", json!({"fileExtension": "png"}));
    assert_eq!(
        op.execute(&no_data).await.unwrap_err().kind(),
        ErrorKind::MissingField
    );

    let bad_data = image_request("alice", json!({"imageData": "not base64!!"}));
    assert_eq!(
        op.execute(&bad_data).await.unwrap_err().kind(),
        ErrorKind::InvalidBody
    );
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn feature_change_passes_values_through_verbatim() {
    let req = Request::new("POST", "/v1/feature/alice")
        .with_path_param("userId", "alice")
        .with_body(json!({"feature": "not-a-known-feature", "featureParam": {"r": 255}}));

    let msg = forwarded(FeatureChange.execute(&req).await.unwrap());
    assert_eq!(msg.request_type, RequestType::FeatureChange);
    assert_eq!(
        msg.event,
        json!({"feature": "not-a-known-feature", "featureParam": {"r": 255}})
    );
}

#[tokio::test]
async fn feature_change_requires_both_fields() {
    let req = Request::new("POST", "/v1/feature/alice")
        .with_path_param("userId", "alice")
        .with_body(json!({"feature": "hat", "featureParam": null}));

    let err = FeatureChange.execute(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);
    assert_eq!(err.to_string(), "missing required field: body.featureParam");
}

#[tokio::test]
async fn get_user_data_accepts_only_empty_bodies() {
    for body in [json!(null), json!({}), json!("")] {
        let req = Request::new("GET", "/v1/user/bob")
            .with_path_param("userId", "bob")
            .with_body(body);
        let msg = forwarded(GetUserData.execute(&req).await.unwrap());
        assert_eq!(msg.event, json!({}));
        assert_eq!(msg.request_type, RequestType::GetUserData);
    }

    let req = Request::new("GET", "/v1/user/bob")
        .with_path_param("userId", "bob")
        .with_body(json!({"x": 1}));
    assert_eq!(
        GetUserData.execute(&req).await.unwrap_err().kind(),
        ErrorKind::InvalidBody
    );
}

#[tokio::test]
async fn upload_mask_answers_with_file_url() {
    let store = store();
    let op = UploadMask::new(store.clone());
    let req = Request::new("POST", "/v1/mask").with_body(json!({
        "fileData": "aGk=",
        "fileExtension": "png",
        "fileName": "fox"
    }));

    let Outcome::Respond(resp) = op.execute(&req).await.unwrap() else {
        panic!("upload-mask must not forward");
    };
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body["fileUrl"], format!("{BASE_URL}/masks/fox.png"));
    assert_eq!(store.get("masks/fox.png").await.unwrap().content_type, "image/png");
}

#[tokio::test]
async fn upload_mask_unknown_extension_is_octet_stream() {
    let store = store();
    let op = UploadMask::new(store.clone());
    let req = Request::new("POST", "/v1/mask").with_body(json!({
        "fileData": "aGk=",
        "fileExtension": "fbx",
        "fileName": "rig"
    }));

    op.execute(&req).await.unwrap();
    assert_eq!(
        store.get("masks/rig.fbx").await.unwrap().content_type,
        "application/octet-stream"
    );
}

#[tokio::test]
async fn upload_mask_allows_dots_inside_name() {
    let store = store();
    let op = UploadMask::new(store.clone());
    let req = Request::new("POST", "/v1/mask").with_body(json!({
        "fileData": "aGk=",
        "fileExtension": "png",
        "fileName": "fox..v2"
    }));

    op.execute(&req).await.unwrap();
    assert!(store.get("masks/fox..v2.png").await.is_some());
}

#[tokio::test]
async fn upload_mask_rejects_bad_input() {
    let store = store();
    let op = UploadMask::new(store.clone());

    let missing = Request::new("POST", "/v1/mask")
        .with_body(json!({"fileData": "aGk=", "fileName": "fox"}));
    assert_eq!(
        op.execute(&missing).await.unwrap_err().kind(),
        ErrorKind::MissingField
    );

    for name in ["../fox", "a/b", "a\\b", "", ".", ".."] {
        let req = Request::new("POST", "/v1/mask").with_body(json!({
            "fileData": "aGk=",
            "fileExtension": "png",
            "fileName": name
        }));
        assert_eq!(
            op.execute(&req).await.unwrap_err().kind(),
            ErrorKind::InvalidBody,
            "{name:?}"
        );
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn download_masks_on_empty_prefix_returns_message() {
    let store = store();
    store
        .put_object("images/alice/x.jpg", vec![1], "image/jpeg")
        .await
        .unwrap();
    store.put_object("masks/", vec![], "application/x-directory").await.unwrap();

    let Outcome::Respond(resp) = DownloadMasks::new(store.clone())
        .execute(&Request::new("GET", "/v1/mask"))
        .await
        .unwrap()
    else {
        panic!("download-masks must not forward");
    };
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, json!({"message": "No masks found", "masksUrls": []}));
}

#[tokio::test]
async fn download_masks_lists_urls() {
    let store = store();
    for name in ["masks/fox.png", "masks/cat.png"] {
        store.put_object(name, vec![1], "image/png").await.unwrap();
    }

    let Outcome::Respond(resp) = DownloadMasks::new(store.clone())
        .execute(&Request::new("GET", "/v1/mask"))
        .await
        .unwrap()
    else {
        panic!("download-masks must not forward");
    };
    assert_eq!(
        resp.body,
        json!({"masksUrls": [
            format!("{BASE_URL}/masks/cat.png"),
            format!("{BASE_URL}/masks/fox.png"),
        ]})
    );

    let with_body = Request::new("GET", "/v1/mask").with_body(json!({"page": 2}));
    assert_eq!(
        DownloadMasks::new(store)
            .execute(&with_body)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidBody
    );
}
