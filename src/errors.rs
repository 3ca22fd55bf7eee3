//! Error results that can be returned from this crate.
//!
//! Malformed markup is never an `Error`: every parse error has a local
//! recovery and is reported through the [`crate::error_logger`] channel
//! instead. The variants here cover genuine misuse and internal conditions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("internal state error: {0}")]
    InternalState(String),
}

pub type Result<T> = std::result::Result<T, Error>;
