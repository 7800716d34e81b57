use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no table structure detected on page {page}")]
    NoTableStructure { page: u32 },

    #[error("table {table_id} on page {page} is too ambiguous (confidence={confidence:.2})")]
    AmbiguousTable {
        page: u32,
        table_id: usize,
        confidence: f32,
    },
}
