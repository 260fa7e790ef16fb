use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the object store or the message bus
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("object storage failure: {0}")]
    Storage(String),
    #[error("message bus failure: {0}")]
    Messaging(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivery guarantee requested from the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

impl QoS {
    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
        }
    }
}

/// Acknowledgement handed back by a publish call; echoed in the HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAck {
    pub message_id: Uuid,
    pub topic: String,
    pub qos: u8,
    pub published_at: DateTime<Utc>,
}

impl PublishAck {
    pub fn new(topic: &str, qos: QoS) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            topic: topic.to_string(),
            qos: qos.level(),
            published_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}
