// src/main.rs
use avatar_relay_api::api_connector::{ApiConnector, ApiRouter, Response};
use avatar_relay_api::config::Config;
use avatar_relay_api::error_handler::StructuredErrorLogger;
use avatar_relay_api::services::{FsObjectStore, JsonlMessageBus};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::from_env();
    log::info!(
        "relaying to topic {} with objects under {}",
        config.topic,
        config.storage_dir.display()
    );

    let store = Arc::new(FsObjectStore::new(
        config.storage_dir.clone(),
        config.storage_base_url.clone(),
    ));
    let bus = Arc::new(JsonlMessageBus::new(config.outbox_path.clone()));
    let error_logger = Arc::new(StructuredErrorLogger::new(config.max_error_message_len));
    let api = ApiConnector::new(
        ApiRouter::with_default_operations(store),
        bus,
        error_logger,
        config.topic.clone(),
    );

    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;

    let output = match serde_json::from_str(&raw) {
        Ok(event) => api.handle_event(&event).await,
        Err(e) => {
            log::error!("stdin is not a JSON event: {}", e);
            Response::error(format!("invalid event: {e}")).to_gateway_json()
        }
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.to_string().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
