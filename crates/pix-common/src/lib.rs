//! PIX Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the PIX photo ingestion
//! workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`PixError`] and the [`Result`] alias
//! - **Checksums**: content addressing for downloaded payloads
//! - **Types**: external records and stored assets
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```
//! use pix_common::checksum::{content_digest, DIGEST_HEX_LEN};
//!
//! let digest = content_digest(b"hello world");
//! assert_eq!(digest.len(), DIGEST_HEX_LEN);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PixError, Result};
