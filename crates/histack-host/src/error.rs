//! Host error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Invalid URL {input}: {reason}")]
    InvalidUrl { input: String, reason: String },
}
