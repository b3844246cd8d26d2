use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectorError>;

/// Caller misuse detected before a scan starts.
///
/// Problems with individual files or constructs never surface here; they become
/// classified triggers in the scan result.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid subscription {id}: {reason}")]
    InvalidSubscription { id: String, reason: String },

    #[error("Duplicate subscription id: {0}")]
    DuplicateSubscription(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Construct error: {0}")]
    Construct(#[from] codesub_constructs::ConstructError),
}

impl DetectorError {
    pub fn invalid_subscription(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubscription {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
