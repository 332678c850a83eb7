//! JSON bridge error type.

use thiserror::Error;

use crate::MsgPackError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("JSON parse error at byte {offset}: {message}")]
    Parse {
        offset: usize,
        message: &'static str,
    },
    #[error(transparent)]
    MsgPack(#[from] MsgPackError),
}

impl JsonError {
    pub(crate) fn parse(offset: usize, message: &'static str) -> Self {
        JsonError::Parse { offset, message }
    }
}
