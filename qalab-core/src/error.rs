use thiserror::Error;

#[derive(Error, Debug)]
pub enum QalabError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Failure inside an interaction store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the scenario validation service.
///
/// `NotFound` and `Validation` are safe to show to callers. `Storage` carries
/// backend detail for logs only; bindings must not echo it back.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Scenario not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ScenarioError {
    /// Stable machine-readable kind used by the protocol layer.
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioError::NotFound(_) => "not_found",
            ScenarioError::Validation(_) => "invalid_input",
            ScenarioError::Storage(_) => "internal",
        }
    }

    /// Message that is safe to return to an end user.
    pub fn public_message(&self) -> String {
        match self {
            ScenarioError::Storage(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}
