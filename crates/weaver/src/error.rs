use thiserror::Error;
use weaver_msgpack::json::JsonError;
use weaver_msgpack::MsgPackError;

/// Errors raised while resolving codecs, packing, unpacking or
/// synthesizing zero values.
///
/// `Clone` so the registry can hand the same failure to every caller that
/// resolves a type it already gave up on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeaverError {
    #[error(transparent)]
    MsgPack(#[from] MsgPackError),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("unsupported arity {arity} for {name}")]
    UnsupportedArity { name: String, arity: usize },
    #[error("{0}")]
    IllegalArgument(String),
    #[error("missing required field `{field}` of {name}")]
    MissingField { name: String, field: String },
    #[error("expected an instance of {expected}, got {actual}")]
    Downcast {
        expected: &'static str,
        actual: &'static str,
    },
}

impl WeaverError {
    pub(crate) fn cannot_convert(what: impl std::fmt::Display, target: &str) -> Self {
        WeaverError::IllegalArgument(format!("cannot convert {what} to {target}"))
    }
}

pub type Result<T, E = WeaverError> = std::result::Result<T, E>;
