use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("height {got} cannot be appended after {tip}")]
    NonContiguousHeight { got: u64, tip: u64 },

    #[error("backend error: {0}")]
    Backend(String),
}
