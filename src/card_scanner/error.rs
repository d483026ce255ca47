use crate::core::reference::ReferenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    #[error("Frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
    #[error("Reference database error: {0}")]
    Reference(#[from] ReferenceError),
    #[error("Invalid scan config: {0}")]
    Config(String),
}
