use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Missing API key")]
    MissingCredentials,
    #[error("Prompt is empty")]
    EmptyPrompt,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl GenerationError {
    /// Errors the user can fix from the plugin settings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingCredentials | GenerationError::ConfigError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
