//! Error types for canvas model operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasModelError {
    #[error("Page not found at index {0}")]
    PageNotFound(usize),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, CanvasModelError>;
