//! Two-pass compiler for configuration stores.
//!
//! A definition document is a tree of domains, each holding typed
//! parameters. Compiling it produces four fixed-record backends:
//!
//! - `DOMAIN.BIN` -- one record per domain, in document order
//! - `PARAM.BIN` -- one record per parameter, referencing its domain
//! - `STRING.BIN` -- one NUL-terminated record per string parameter
//! - `BLOB.BIN` -- blob contents split into fixed-size blocks
//!
//! # Passes
//!
//! 1. [`count_elements`] walks the tree and totals the records of each kind.
//! 2. [`provision`] creates the backends with exactly that capacity.
//! 3. [`encode_document`] walks the tree again in the same order and writes
//!    every record, handing out indices from an [`EncoderContext`].
//!
//! [`Compiler`] runs the three steps and checks that the encoder wrote
//! exactly what the counter sized. [`StoreReader`] reads a store back.
//!
//! # Design Rules
//!
//! 1. Every error aborts the compilation. No record is skipped.
//! 2. A domain's index advances only when the next domain element is seen.
//! 3. Read/write flags apply to the next parameter value only.
//! 4. Blob sources must not change between the two passes.

pub mod access;
pub mod blob;
pub mod compiler;
pub mod counter;
pub mod document;
pub mod element;
pub mod encoder;
pub mod error;
pub mod provision;
pub mod reader;

pub use access::AccessTracker;
pub use blob::{block_count, load_blob, write_blob_blocks, BlobSource, FsBlobSource, MemoryBlobSource};
pub use compiler::{CompileReport, Compiler};
pub use counter::{count_elements, ElementCounts};
pub use document::{DocNode, Document, NodeKind};
pub use element::ElementKind;
pub use encoder::{encode_document, encode_with_context, parse_unsigned, DomainState, EncoderContext};
pub use error::{CompileError, CompileResult};
pub use provision::{open_backends, provision, BackendKind, StoreBackends};
pub use reader::{DomainSnapshot, ParameterSnapshot, ResolvedValue, StoreReader, StoreSnapshot};
