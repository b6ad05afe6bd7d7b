use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{check_index, check_write, payload_len, BackendProvider, RecordBackend};

struct MemoryData {
    record_count: u32,
    record_size: usize,
    bytes: Vec<u8>,
}

/// In-memory backend provider.
///
/// Intended for tests and embedding. Backends created through the provider
/// share their storage with it, so a backend reopened by name sees every
/// record written through an earlier handle.
pub struct MemoryProvider {
    backends: RwLock<HashMap<String, Arc<RwLock<MemoryData>>>>,
}

impl MemoryProvider {
    /// Create a provider with no backends.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` if a backend with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.backends.read().expect("lock poisoned").contains_key(name)
    }

    /// Sorted names of all backends.
    pub fn names(&self) -> Vec<String> {
        let map = self.backends.read().expect("lock poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Raw contents of a backend, if it exists.
    pub fn raw_bytes(&self, name: &str) -> Option<Vec<u8>> {
        let map = self.backends.read().expect("lock poisoned");
        map.get(name)
            .map(|data| data.read().expect("lock poisoned").bytes.clone())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendProvider for MemoryProvider {
    type Backend = MemoryBackend;

    fn create(&self, name: &str, record_count: u32, record_size: usize) -> StoreResult<MemoryBackend> {
        let len = payload_len(name, record_count, record_size)?;
        let data = Arc::new(RwLock::new(MemoryData {
            record_count,
            record_size,
            bytes: vec![0u8; len as usize],
        }));
        self.backends
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), Arc::clone(&data));
        debug!(backend = name, record_count, record_size, "memory backend created");
        Ok(MemoryBackend {
            name: name.to_string(),
            data,
            closed: false,
        })
    }

    fn open(&self, name: &str) -> StoreResult<MemoryBackend> {
        let map = self.backends.read().expect("lock poisoned");
        let data = map
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(MemoryBackend {
            name: name.to_string(),
            data: Arc::clone(data),
            closed: false,
        })
    }
}

impl std::fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("backends", &self.names())
            .finish()
    }
}

/// Handle to a backend owned by a [`MemoryProvider`].
pub struct MemoryBackend {
    name: String,
    data: Arc<RwLock<MemoryData>>,
    closed: bool,
}

impl MemoryBackend {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed(self.name.clone()));
        }
        Ok(())
    }
}

impl RecordBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn record_count(&self) -> u32 {
        self.data.read().expect("lock poisoned").record_count
    }

    fn record_size(&self) -> usize {
        self.data.read().expect("lock poisoned").record_size
    }

    fn read_record(&mut self, index: u32) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let data = self.data.read().expect("lock poisoned");
        check_index(&self.name, index, data.record_count)?;
        let start = index as usize * data.record_size;
        Ok(data.bytes[start..start + data.record_size].to_vec())
    }

    fn write_record(&mut self, index: u32, record: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        let mut data = self.data.write().expect("lock poisoned");
        check_write(&self.name, index, data.record_count, data.record_size, record)?;
        let start = index as usize * data.record_size;
        let end = start + data.record_size;
        data.bytes[start..end].copy_from_slice(record);
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("name", &self.name)
            .field("record_count", &self.record_count())
            .field("record_size", &self.record_size())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_write_read() {
        let provider = MemoryProvider::new();
        let mut backend = provider.create("PARAM.BIN", 2, 4).unwrap();
        assert_eq!(backend.record_count(), 2);
        assert_eq!(backend.record_size(), 4);

        backend.write_record(1, b"abcd").unwrap();
        assert_eq!(backend.read_record(0).unwrap(), vec![0; 4]);
        assert_eq!(backend.read_record(1).unwrap(), b"abcd");
    }

    #[test]
    fn reopen_shares_storage() {
        let provider = MemoryProvider::new();
        let mut backend = provider.create("DOMAIN.BIN", 1, 3).unwrap();
        backend.write_record(0, b"xyz").unwrap();
        backend.close().unwrap();

        let mut reopened = provider.open("DOMAIN.BIN").unwrap();
        assert_eq!(reopened.read_record(0).unwrap(), b"xyz");
        assert_eq!(provider.raw_bytes("DOMAIN.BIN").unwrap(), b"xyz");
    }

    #[test]
    fn capacity_is_enforced() {
        let provider = MemoryProvider::new();
        let mut backend = provider.create("STRING.BIN", 1, 2).unwrap();
        let err = backend.write_record(1, b"ab").unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { capacity: 1, .. }));
        assert_eq!(provider.raw_bytes("STRING.BIN").unwrap(), vec![0, 0]);
    }

    #[test]
    fn empty_backend_allowed() {
        let provider = MemoryProvider::new();
        let mut backend = provider.create("BLOB.BIN", 0, 64).unwrap();
        assert_eq!(backend.record_count(), 0);
        assert!(backend.read_record(0).is_err());
    }

    #[test]
    fn open_missing() {
        let provider = MemoryProvider::new();
        assert!(matches!(provider.open("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn create_replaces_existing() {
        let provider = MemoryProvider::new();
        let mut first = provider.create("B", 1, 1).unwrap();
        first.write_record(0, &[9]).unwrap();
        provider.create("B", 2, 1).unwrap();
        assert_eq!(provider.raw_bytes("B").unwrap(), vec![0, 0]);
        assert_eq!(provider.names(), vec!["B".to_string()]);
    }

    #[test]
    fn closed_backend_rejects_io() {
        let provider = MemoryProvider::new();
        let mut backend = provider.create("B", 1, 1).unwrap();
        backend.close().unwrap();
        backend.close().unwrap();
        assert!(matches!(backend.write_record(0, &[1]), Err(StoreError::Closed(_))));
        assert!(matches!(backend.read_record(0), Err(StoreError::Closed(_))));
    }
}
