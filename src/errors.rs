use thiserror::Error;

/// Hard failures. Malformed HTML is never one of these; the parser recovers
/// from markup errors and records them in the [`ErrorLogger`](crate::error_logger::ErrorLogger).
#[derive(Debug, Error)]
pub enum Error {
    #[error("input is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("unsupported encoding: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
