use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{kind} file does not exist: {}", path.display())]
    FileNotFound { kind: &'static str, path: PathBuf },

    #[error("failed to parse JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Validation(String),

    /// The matched container has no `logConfiguration.options` map to write the log group into.
    #[error("Invalid task definition: container definition '{container}' has no logConfiguration.options object")]
    MissingLogOptions { container: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize task definition: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl RenderError {
    pub(crate) fn missing_container_definitions() -> Self {
        RenderError::Validation(
            "Invalid task definition format: containerDefinitions section is not present or is not an array"
                .to_string(),
        )
    }

    pub(crate) fn container_not_found() -> Self {
        RenderError::Validation(
            "Invalid task definition: Could not find container definition with matching name"
                .to_string(),
        )
    }
}
