//! Foundation types for compiled configuration stores.
//!
//! A compiled store is four fixed-stride record backends (domains,
//! parameters, strings and blob blocks). This crate owns everything both
//! the compiler and a runtime reader must agree on byte-for-byte.
//!
//! # Key Types
//!
//! - [`StoreLayout`] -- record-size parameters of a store
//! - [`ParamType`] -- closed set of parameter kinds, resolved from type tokens
//! - [`AccessRights`] -- global read/write permission word
//! - [`DomainRecord`] / [`ParameterRecord`] -- fixed-width record codecs
//! - [`ParameterValue`] -- inline value or reference into the string/blob backends

pub mod error;
pub mod layout;
pub mod param;
pub mod record;

pub use error::TypeError;
pub use layout::StoreLayout;
pub use param::{AccessRights, ParamType};
pub use record::{
    decode_name, decode_string, encode_name, encode_string, DomainRecord, ParameterRecord,
    ParameterValue,
};
