//! Errors raised while reading a save state back.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("save state has no section \"{0}\"")]
    MissingSection(String),

    #[error("section \"{section}\" has no key \"{key}\"")]
    MissingKey { section: String, key: String },

    #[error("buffer \"{key}\" holds {found} bytes, expected {expected}")]
    BufferLength {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("value {value:#x} stored under \"{key}\" is out of range")]
    OutOfRange { key: String, value: u64 },
}

pub type Result<T> = std::result::Result<T, StateError>;
