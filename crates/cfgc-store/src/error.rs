/// Errors from record backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record index is outside the capacity fixed at creation.
    #[error("backend {backend}: record index {index} exceeds capacity of {capacity} records")]
    CapacityExceeded {
        backend: String,
        index: u32,
        capacity: u32,
    },

    /// A write supplied the wrong number of bytes.
    #[error("backend {backend}: record of {actual} bytes, expected {expected}")]
    RecordSizeMismatch {
        backend: String,
        expected: usize,
        actual: usize,
    },

    /// The requested backend does not exist.
    #[error("backend not found: {0}")]
    NotFound(String),

    /// Record size or count cannot be represented.
    #[error("invalid geometry for backend {backend}: {reason}")]
    InvalidGeometry { backend: String, reason: String },

    /// Stored data does not match its header.
    #[error("corrupt backend {backend}: {reason}")]
    Corrupt { backend: String, reason: String },

    /// The backend was already closed.
    #[error("backend {0} is closed")]
    Closed(String),

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for backend operations.
pub type StoreResult<T> = Result<T, StoreError>;
