//! Error types for PIX

use thiserror::Error;

/// Result type alias for PIX common operations
pub type Result<T> = std::result::Result<T, PixError>;

/// Main error type for PIX common utilities
#[derive(Error, Debug)]
pub enum PixError {
    #[error("Configuration error: {0}")]
    Config(String),
}
