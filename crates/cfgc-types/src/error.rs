use thiserror::Error;

/// Errors produced by type resolution and record codecs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unsupported parameter type: {0:?}")]
    UnknownParamType(String),

    #[error("invalid access setting {0:?}: expected \"true\" or \"false\"")]
    InvalidAccessSetting(String),

    #[error("unknown parameter type tag: {0}")]
    UnknownTypeTag(u32),

    #[error("invalid access rights word: {0:#010x}")]
    InvalidAccessWord(u32),

    #[error("invalid record length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid store layout: {0}")]
    InvalidLayout(String),
}
