use super::types::{PublishAck, QoS, UpstreamError};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Message bus seam: publish a payload on a topic and return the acknowledgement
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        payload: &[u8],
    ) -> Result<PublishAck, UpstreamError>;
}

/// A message as it was handed to the bus
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub ack: PublishAck,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn payload_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Records every publish; lets tests assert on what was forwarded
#[derive(Default)]
pub struct InMemoryMessageBus {
    published: Mutex<Vec<PublishedMessage>>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        payload: &[u8],
    ) -> Result<PublishAck, UpstreamError> {
        let ack = PublishAck::new(topic, qos);
        self.published.lock().await.push(PublishedMessage {
            ack: ack.clone(),
            payload: payload.to_vec(),
        });
        Ok(ack)
    }
}

/// Appends one JSON line per published message to an outbox file
pub struct JsonlMessageBus {
    path: PathBuf,
    // serialises appends so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlMessageBus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl MessageBus for JsonlMessageBus {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        payload: &[u8],
    ) -> Result<PublishAck, UpstreamError> {
        let ack = PublishAck::new(topic, qos);
        let body = match serde_json::from_slice::<Value>(payload) {
            Ok(v) => v,
            Err(_) => Value::String(String::from_utf8_lossy(payload).into_owned()),
        };
        let record = json!({
            "messageId": ack.message_id,
            "topic": ack.topic,
            "qos": ack.qos,
            "publishedAt": ack.published_at,
            "payload": body,
        });
        let mut line = serde_json::to_string(&record)
            .map_err(|e| UpstreamError::Messaging(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        log::debug!("published {} to {} via {}", ack.message_id, topic, self.path.display());
        Ok(ack)
    }
}
