//! Blob sources, sizing and chunking.
//!
//! A blob parameter names a file relative to the definition document. Its
//! stored content is the file's bytes followed by one NUL terminator, split
//! into fixed-size blocks with the final block zero-padded.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use cfgc_store::{RecordBackend, StoreResult};

use crate::error::{CompileError, CompileResult};

/// Reads the raw bytes behind a blob parameter.
///
/// Both compiler passes read every blob; an implementation must return the
/// same bytes for the same path for the duration of one compilation.
pub trait BlobSource {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads blobs from the host filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsBlobSource;

impl BlobSource for FsBlobSource {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Serves blobs from an in-memory map keyed by full path.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobSource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryBlobSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl BlobSource for MemoryBlobSource {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no blob at {}", path.display()))
        })
    }
}

impl<T: BlobSource + ?Sized> BlobSource for &T {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }
}

/// Resolve `reference` against `base_dir` and load the terminated blob content.
///
/// `parameter` names the parameter holding the reference, for error reports.
pub fn load_blob<S: BlobSource + ?Sized>(
    source: &S,
    base_dir: &Path,
    reference: &str,
    parameter: Option<&str>,
) -> CompileResult<(PathBuf, Vec<u8>)> {
    let path = base_dir.join(reference.trim());
    let mut content = source.read(&path).map_err(|source| CompileError::BlobRead {
        path: path.clone(),
        parameter: parameter.map(str::to_owned),
        source,
    })?;
    content.push(0);
    if content.len() > u32::MAX as usize {
        return Err(CompileError::BlobTooLarge {
            size: content.len(),
            path,
        });
    }
    Ok((path, content))
}

/// Number of `block_len`-byte blocks needed for `len` bytes; at least one.
///
/// `block_len` must be non-zero.
pub fn block_count(len: usize, block_len: usize) -> u32 {
    debug_assert!(block_len > 0, "block length must be non-zero");
    len.div_ceil(block_len).max(1) as u32
}

/// Write `data` as consecutive blocks starting at `start_index`.
///
/// Each block is exactly `backend.record_size()` bytes; the last one is
/// zero-padded. Empty input writes a single zero block. Returns the number
/// of blocks written, always equal to [`block_count`] for the same input.
pub fn write_blob_blocks<B: RecordBackend + ?Sized>(
    backend: &mut B,
    start_index: u32,
    data: &[u8],
) -> StoreResult<u32> {
    let block_len = backend.record_size();
    let mut scratch = vec![0u8; block_len];

    if data.is_empty() {
        backend.write_record(start_index, &scratch)?;
        return Ok(1);
    }

    let mut index = start_index;
    for chunk in data.chunks(block_len) {
        scratch.fill(0);
        scratch[..chunk.len()].copy_from_slice(chunk);
        backend.write_record(index, &scratch)?;
        index += 1;
    }
    Ok(index - start_index)
}
