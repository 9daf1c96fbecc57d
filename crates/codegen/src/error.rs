//! Codegen error types.

use ebb_parser::EbbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    /// Scan, parse or type error from the front end.
    #[error(transparent)]
    Front(#[from] EbbError),

    /// The canonical formatter rejected the generated source. This is
    /// an internal consistency bug; the full numbered source rides
    /// along for diagnosis.
    #[error("emit: bad generated source: {err}\n{listing}")]
    BadSource { err: String, listing: String },

    #[error("emit: {0}")]
    Emit(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodegenResult<T> = Result<T, CodegenError>;
