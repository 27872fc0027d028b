//! Error types for visa-engine operations.
//!
//! Data-quality problems in stay records (bad dates, missing fields, unknown
//! countries) are never errors: they are reported through return values.
//! `VisaError` covers caller misuse at the edges: parsing explicit arguments
//! and decoding payloads.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisaError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The payload has the wrong shape (e.g., stays that are not a list).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VisaError>;
