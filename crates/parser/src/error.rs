//! Error types for the front end.
//!
//! Every phase fails fast: the first error terminates the translation
//! and bubbles up to the driver. Each variant carries the position the
//! failure was detected at.

use thiserror::Error;

use crate::lexer::token::Pos;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EbbError {
    #[error("scan: {msg} ({pos})")]
    Scan { msg: String, pos: Pos },

    #[error("parse: {msg} ({pos})")]
    Parse { msg: String, pos: Pos },

    #[error("type: {msg} ({pos})")]
    Type { msg: String, pos: Pos },

    #[error("load: {0}")]
    Load(String),
}

impl EbbError {
    pub fn scan(msg: impl Into<String>, pos: Pos) -> Self {
        EbbError::Scan {
            msg: msg.into(),
            pos,
        }
    }

    pub fn parse(msg: impl Into<String>, pos: Pos) -> Self {
        EbbError::Parse {
            msg: msg.into(),
            pos,
        }
    }

    pub fn typecheck(msg: impl Into<String>, pos: Pos) -> Self {
        EbbError::Type {
            msg: msg.into(),
            pos,
        }
    }
}

pub type Result<T> = std::result::Result<T, EbbError>;
