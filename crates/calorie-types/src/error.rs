//! Error types for calorie-log

use thiserror::Error;

/// Boxed source error for transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the vision analysis pipeline.
///
/// Every variant is recoverable: no entry is created and the user may retry.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("API key is missing. Please add your API key in settings.")]
    MissingCredential,

    #[error("The image data is invalid. Please try taking the photo again.")]
    InvalidImageData,

    #[error("Network error: {0}")]
    Network(#[source] BoxError),

    #[error("API Error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("The AI service returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl VisionError {
    /// Build a network error from any transport failure
    pub fn network<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        VisionError::Network(err.into())
    }

    /// True for failures below the HTTP layer (connect, timeout, body read)
    pub fn is_transport(&self) -> bool {
        matches!(self, VisionError::Network(_))
    }

    /// Short advice for the user
    pub fn user_hint(&self) -> &'static str {
        match self {
            VisionError::MissingCredential => "Add an API key with `calorie-log settings --api-key`.",
            VisionError::InvalidImageData => "Retake the photo and try again.",
            VisionError::Network(_) => "Check your internet connection and try again.",
            VisionError::Api { status_code: 0, .. } => "Take a clearer photo of the food.",
            VisionError::Api { .. } | VisionError::InvalidResponse(_) => {
                "Check your API key and the provider's service status."
            }
        }
    }
}

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store data corrupted: {0}")]
    Corrupted(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
