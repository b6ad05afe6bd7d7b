use crate::error::{StoreError, StoreResult};

/// Capacity-bounded store of fixed-size records.
///
/// All implementations must satisfy these invariants:
/// - `record_count` and `record_size` never change after creation.
/// - `write_record` rejects an index `>= record_count` with
///   [`StoreError::CapacityExceeded`] and leaves the store untouched.
/// - `write_record` rejects a buffer whose length is not `record_size`.
/// - Unwritten records read back as `record_size` zero bytes.
pub trait RecordBackend {
    /// Name the backend was created under.
    fn name(&self) -> &str;

    /// Capacity in records.
    fn record_count(&self) -> u32;

    /// Size of every record in bytes.
    fn record_size(&self) -> usize;

    /// Read the record at `index`.
    fn read_record(&mut self, index: u32) -> StoreResult<Vec<u8>>;

    /// Overwrite the record at `index`.
    fn write_record(&mut self, index: u32, data: &[u8]) -> StoreResult<()>;

    /// Flush pending data and release the underlying handle.
    ///
    /// Closing twice is a no-op. Any other operation after close fails
    /// with [`StoreError::Closed`].
    fn close(&mut self) -> StoreResult<()>;
}

/// Creates and reopens named backends on some storage medium.
pub trait BackendProvider {
    type Backend: RecordBackend;

    /// Create (or replace) a backend with room for `record_count` records
    /// of `record_size` bytes each, all zeroed.
    fn create(&self, name: &str, record_count: u32, record_size: usize)
        -> StoreResult<Self::Backend>;

    /// Reopen a previously created backend.
    fn open(&self, name: &str) -> StoreResult<Self::Backend>;
}

/// Validate a write against a backend's geometry.
pub(crate) fn check_write(
    backend: &str,
    index: u32,
    record_count: u32,
    record_size: usize,
    data: &[u8],
) -> StoreResult<()> {
    check_index(backend, index, record_count)?;
    if data.len() != record_size {
        return Err(StoreError::RecordSizeMismatch {
            backend: backend.to_string(),
            expected: record_size,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Validate a record index against a backend's capacity.
pub(crate) fn check_index(backend: &str, index: u32, record_count: u32) -> StoreResult<()> {
    if index >= record_count {
        return Err(StoreError::CapacityExceeded {
            backend: backend.to_string(),
            index,
            capacity: record_count,
        });
    }
    Ok(())
}

/// Total payload bytes for a geometry, rejecting zero-sized records and overflow.
pub(crate) fn payload_len(backend: &str, record_count: u32, record_size: usize) -> StoreResult<u64> {
    if record_size == 0 || record_size > u32::MAX as usize {
        return Err(StoreError::InvalidGeometry {
            backend: backend.to_string(),
            reason: format!("record size {record_size} out of range"),
        });
    }
    (record_count as u64)
        .checked_mul(record_size as u64)
        .ok_or_else(|| StoreError::InvalidGeometry {
            backend: backend.to_string(),
            reason: format!("{record_count} records of {record_size} bytes overflow"),
        })
}
