//! Errors raised while parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid block hash: {0}")]
    InvalidHash(String),
}
