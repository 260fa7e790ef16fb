use std::path::PathBuf;

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Storage bucket name (default: avatar-assets).
    pub bucket: String,
    /// Cloud region, used to derive the default object URL.
    pub region: String,
    /// Topic outbound messages are published on.
    pub topic: String,
    /// Prefix of every object URL handed back to callers.
    pub storage_base_url: String,
    /// Directory backing the local object store.
    pub storage_dir: PathBuf,
    /// JSONL file the local message bus appends to.
    pub outbox_path: PathBuf,
    /// Error messages longer than this are truncated before logging.
    pub max_error_message_len: usize,
}

impl Config {
    /// Load configuration from `AVATAR_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup("AVATAR_BUCKET").unwrap_or_else(|| "avatar-assets".to_string());
        let region = lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string());
        let storage_base_url = lookup("AVATAR_STORAGE_BASE_URL")
            .unwrap_or_else(|| format!("https://{bucket}.s3.{region}.amazonaws.com"));

        Self {
            topic: lookup("AVATAR_TOPIC").unwrap_or_else(|| "user-requests".to_string()),
            storage_dir: lookup("AVATAR_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/objects")),
            outbox_path: lookup("AVATAR_OUTBOX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/outbox.jsonl")),
            max_error_message_len: lookup("AVATAR_MAX_ERROR_LEN")
                .and_then(|v| v.parse().ok())
                .unwrap_or(512),
            bucket,
            region,
            storage_base_url,
        }
    }
}
