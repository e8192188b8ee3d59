use thiserror::Error;

/// Failure parsing or validating a runtime configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service at index {index} has an empty name")]
    EmptyServiceName { index: usize },

    #[error("duplicate service name in config: {0}")]
    DuplicateServiceName(String),
}
