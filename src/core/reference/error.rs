use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Reference database is empty")]
    Empty,
    #[error("Entry {index}: card id must not be empty")]
    EmptyId { index: usize },
    #[error("Entry {index} ({id}): hash must be 16 hex characters, got {hash:?}")]
    MalformedHash {
        index: usize,
        id: String,
        hash: String,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
}
