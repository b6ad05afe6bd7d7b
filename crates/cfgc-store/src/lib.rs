//! Record backends for compiled configuration stores.
//!
//! A backend is a capacity-bounded store of fixed-size records addressed by
//! a zero-based integer index. Capacity and record size are fixed when the
//! backend is created and never change afterwards.
//!
//! # Storage Backends
//!
//! All backends implement [`RecordBackend`] and are created or reopened
//! through a [`BackendProvider`]:
//!
//! - [`MemoryProvider`] -- `HashMap`-based provider for tests and embedding
//! - [`FileProvider`] -- one host file per backend inside a directory
//!
//! # Design Rules
//!
//! 1. A write outside `[0, record_count)` is an error, never a resize.
//! 2. A write must supply exactly `record_size` bytes.
//! 3. Records never written read back as zeroes.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileBackend, FileProvider, FILE_HEADER_LEN};
pub use memory::{MemoryBackend, MemoryProvider};
pub use traits::{BackendProvider, RecordBackend};
