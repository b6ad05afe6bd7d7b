use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{check_index, check_write, payload_len, BackendProvider, RecordBackend};

/// Header size: 4 bytes record count + 4 bytes record size.
pub const FILE_HEADER_LEN: u64 = 8;

/// Provider storing each backend as one file inside a directory.
///
/// On-disk format of a backend file:
/// ```text
/// [4 bytes: record count (little-endian u32)]
/// [4 bytes: record size  (little-endian u32)]
/// [record count * record size bytes: records, zero-initialised]
/// ```
#[derive(Clone, Debug)]
pub struct FileProvider {
    root: PathBuf,
}

impl FileProvider {
    /// Use `root` as the backend directory, creating it if needed.
    pub fn new(root: &Path) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `name`.
    pub fn backend_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl BackendProvider for FileProvider {
    type Backend = FileBackend;

    fn create(&self, name: &str, record_count: u32, record_size: usize) -> StoreResult<FileBackend> {
        let len = payload_len(name, record_count, record_size)?;
        let path = self.backend_path(name);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        file.write_all(&record_count.to_le_bytes())?;
        file.write_all(&(record_size as u32).to_le_bytes())?;
        file.set_len(FILE_HEADER_LEN + len)?;

        debug!(backend = name, path = %path.display(), record_count, record_size, "file backend created");
        Ok(FileBackend {
            name: name.to_string(),
            path,
            file: Some(file),
            record_count,
            record_size,
        })
    }

    fn open(&self, name: &str) -> StoreResult<FileBackend> {
        let path = self.backend_path(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_len = file.metadata()?.len();
        if file_len < FILE_HEADER_LEN {
            return Err(StoreError::Corrupt {
                backend: name.to_string(),
                reason: format!("file is {file_len} bytes, shorter than its header"),
            });
        }

        let mut header = [0u8; FILE_HEADER_LEN as usize];
        file.read_exact(&mut header)?;
        let record_count = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let record_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let expected = FILE_HEADER_LEN + payload_len(name, record_count, record_size)?;
        if file_len != expected {
            return Err(StoreError::Corrupt {
                backend: name.to_string(),
                reason: format!(
                    "header declares {record_count} records of {record_size} bytes \
                     ({expected} bytes total) but file is {file_len} bytes"
                ),
            });
        }

        Ok(FileBackend {
            name: name.to_string(),
            path,
            file: Some(file),
            record_count,
            record_size,
        })
    }
}

/// A backend stored in a single host file.
///
/// The file handle is released on [`RecordBackend::close`] or on drop.
#[derive(Debug)]
pub struct FileBackend {
    name: String,
    path: PathBuf,
    file: Option<File>,
    record_count: u32,
    record_size: usize,
}

impl FileBackend {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_mut(&mut self) -> StoreResult<&mut File> {
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(StoreError::Closed(self.name.clone())),
        }
    }

    fn offset(&self, index: u32) -> u64 {
        FILE_HEADER_LEN + index as u64 * self.record_size as u64
    }
}

impl RecordBackend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn record_count(&self) -> u32 {
        self.record_count
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn read_record(&mut self, index: u32) -> StoreResult<Vec<u8>> {
        check_index(&self.name, index, self.record_count)?;
        let offset = self.offset(index);
        let mut record = vec![0u8; self.record_size];
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut record)?;
        Ok(record)
    }

    fn write_record(&mut self, index: u32, data: &[u8]) -> StoreResult<()> {
        check_write(&self.name, index, self.record_count, self.record_size, data)?;
        let offset = self.offset(index);
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
            debug!(backend = %self.name, "file backend closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sizes_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();
        let mut backend = provider.create("PARAM.BIN", 3, 16).unwrap();
        backend.close().unwrap();

        let bytes = fs::read(provider.backend_path("PARAM.BIN")).unwrap();
        assert_eq!(bytes.len(), 8 + 3 * 16);
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &16u32.to_le_bytes());
        assert!(bytes[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();

        let mut backend = provider.create("STRING.BIN", 2, 4).unwrap();
        backend.write_record(1, b"wxyz").unwrap();
        backend.write_record(0, b"abcd").unwrap();
        backend.close().unwrap();

        let mut reopened = provider.open("STRING.BIN").unwrap();
        assert_eq!(reopened.record_count(), 2);
        assert_eq!(reopened.record_size(), 4);
        assert_eq!(reopened.read_record(0).unwrap(), b"abcd");
        assert_eq!(reopened.read_record(1).unwrap(), b"wxyz");
    }

    #[test]
    fn capacity_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();
        let mut backend = provider.create("BLOB.BIN", 1, 4).unwrap();
        let err = backend.write_record(1, b"abcd").unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { index: 1, .. }));
        backend.close().unwrap();
        assert_eq!(fs::metadata(backend.path()).unwrap().len(), 12);
    }

    #[test]
    fn open_missing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();
        assert!(matches!(provider.open("DOMAIN.BIN"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn open_truncated_backend() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        fs::write(provider.backend_path("PARAM.BIN"), &data).unwrap();

        let err = provider.open("PARAM.BIN").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn open_headerless_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();
        fs::write(provider.backend_path("X"), [1, 2, 3]).unwrap();
        assert!(matches!(provider.open("X"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn closed_backend_rejects_io() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path()).unwrap();
        let mut backend = provider.create("B", 1, 1).unwrap();
        backend.close().unwrap();
        backend.close().unwrap();
        assert!(matches!(backend.write_record(0, &[1]), Err(StoreError::Closed(_))));
    }
}
