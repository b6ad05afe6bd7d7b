use std::path::PathBuf;

use cfgc_store::StoreError;
use cfgc_types::{ParamType, TypeError};
use thiserror::Error;

/// Errors that abort a compilation.
///
/// Every variant is terminal: the compiler never skips a record and
/// continues.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("document has no root element")]
    EmptyDocument,

    #[error("unsupported parameter type {token:?}{}", fmt_param(.parameter))]
    UnsupportedType {
        token: String,
        parameter: Option<String>,
    },

    #[error("invalid access setting {token:?} in <{element}>{}: expected \"true\" or \"false\"", fmt_param(.parameter))]
    InvalidAccessSetting {
        element: &'static str,
        token: String,
        parameter: Option<String>,
    },

    #[error("<{element}> element is missing its {attribute:?} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("blob type declared{} but no <value> element follows it", fmt_param(.parameter))]
    MissingBlobValue { parameter: Option<String> },

    #[error("<value> element without a preceding <param_name>")]
    ValueWithoutName,

    #[error("<value> element for parameter {parameter:?} without a preceding <type>")]
    ValueWithoutType { parameter: String },

    #[error("parameter {parameter:?} appears before any <domain>")]
    ParameterOutsideDomain { parameter: String },

    #[error("cannot read blob source {}{}: {source}", .path.display(), fmt_param(.parameter))]
    BlobRead {
        path: PathBuf,
        parameter: Option<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("blob source {} is {size} bytes, larger than a store can address", .path.display())]
    BlobTooLarge { path: PathBuf, size: usize },

    #[error("{backend} would need more than {} records{}", u32::MAX, fmt_param(.parameter))]
    CountOverflow {
        backend: &'static str,
        parameter: Option<String>,
    },

    #[error("parameter {parameter:?}: cannot parse {text:?} as {ty}")]
    NumericParse {
        parameter: String,
        ty: ParamType,
        text: String,
    },

    #[error("cannot create backend {backend}: {source}")]
    Provision {
        backend: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("write to backend {backend} failed{}: {source}", fmt_param(.parameter))]
    Backend {
        backend: &'static str,
        parameter: Option<String>,
        #[source]
        source: StoreError,
    },

    #[error("counting and encoding passes diverged for {backend}: counted {counted}, wrote {written}")]
    PassDivergence {
        backend: &'static str,
        counted: u32,
        written: u32,
    },

    #[error("invalid record in {backend} at index {index}: {source}")]
    Record {
        backend: &'static str,
        index: u32,
        #[source]
        source: TypeError,
    },

    #[error("inconsistent store: {0}")]
    InconsistentStore(String),

    #[error("output path already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("invalid layout: {0}")]
    Layout(#[from] TypeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_param(parameter: &Option<String>) -> String {
    match parameter {
        Some(name) => format!(" (parameter {name:?})"),
        None => String::new(),
    }
}

/// Result alias for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_names_parameter() {
        let err = CompileError::UnsupportedType {
            token: "float".into(),
            parameter: Some("ratio".into()),
        };
        let display = err.to_string();
        assert!(display.contains("\"float\""));
        assert!(display.contains("\"ratio\""));
    }

    #[test]
    fn backend_error_names_backend() {
        let err = CompileError::Backend {
            backend: "PARAM.BIN",
            parameter: None,
            source: StoreError::Closed("PARAM.BIN".into()),
        };
        assert!(err.to_string().starts_with("write to backend PARAM.BIN failed:"));
    }

    #[test]
    fn count_overflow_names_backend() {
        let err = CompileError::CountOverflow {
            backend: "BLOB.BIN",
            parameter: Some("cert".into()),
        };
        assert_eq!(
            err.to_string(),
            "BLOB.BIN would need more than 4294967295 records (parameter \"cert\")"
        );
    }
}
