//! Entities and repository seams for organizations and profiles

pub mod organizations;
pub mod profiles;

pub use organizations::*;
pub use profiles::*;

/// Errors raised by any repository implementation
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("organization with key '{0}' already exists")]
    DuplicateKey(String),

    #[error("user '{0}' already exists")]
    DuplicateUsername(String),

    #[error("{0} does not exist")]
    Missing(String),
}
