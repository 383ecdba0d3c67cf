//! Common error types for audiocat

use thiserror::Error;

/// Common result type for audiocat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by the catalog store and bootstrap configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog query, schema statement or connection failure
    #[error("Catalog store error: {0}")]
    Database(#[from] sqlx::Error),

    /// Catalog directory could not be created
    #[error("Catalog file error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file present but unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_layer() {
        let err = Error::Config("Parse /etc/audiocat.toml failed".to_string());
        assert_eq!(err.to_string(), "Configuration error: Parse /etc/audiocat.toml failed");

        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(err.to_string().starts_with("Catalog store error"));
    }
}
