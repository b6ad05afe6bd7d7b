//! Backend provisioning: create the four record stores sized by the counter.

use cfgc_store::{BackendProvider, RecordBackend, StoreError, StoreResult};
use cfgc_types::StoreLayout;
use tracing::{debug, info};

use crate::counter::ElementCounts;
use crate::error::{CompileError, CompileResult};

/// The four backends of a compiled store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Domain,
    Parameter,
    String,
    Blob,
}

impl BackendKind {
    /// Every kind, in provisioning order.
    pub const ALL: [BackendKind; 4] = [Self::Domain, Self::Parameter, Self::String, Self::Blob];

    /// Name the backend is created under.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Domain => "DOMAIN.BIN",
            Self::Parameter => "PARAM.BIN",
            Self::String => "STRING.BIN",
            Self::Blob => "BLOB.BIN",
        }
    }

    pub fn record_size(&self, layout: &StoreLayout) -> usize {
        match self {
            Self::Domain => layout.domain_record_size(),
            Self::Parameter => layout.parameter_record_size(),
            Self::String => layout.string_record_size(),
            Self::Blob => layout.blob_block_size(),
        }
    }

    /// Record capacity for this kind under `counts`.
    pub fn capacity(&self, counts: &ElementCounts) -> u32 {
        match self {
            Self::Domain => counts.domains,
            Self::Parameter => counts.parameters,
            Self::String => counts.strings,
            Self::Blob => counts.blob_blocks,
        }
    }
}

/// Open handles to the four backends of one store.
#[derive(Debug)]
pub struct StoreBackends<B> {
    pub domains: B,
    pub parameters: B,
    pub strings: B,
    pub blobs: B,
}

impl<B: RecordBackend> StoreBackends<B> {
    pub fn get_mut(&mut self, kind: BackendKind) -> &mut B {
        match kind {
            BackendKind::Domain => &mut self.domains,
            BackendKind::Parameter => &mut self.parameters,
            BackendKind::String => &mut self.strings,
            BackendKind::Blob => &mut self.blobs,
        }
    }

    /// Record counts of the backends as opened.
    pub fn capacities(&self) -> ElementCounts {
        ElementCounts {
            domains: self.domains.record_count(),
            parameters: self.parameters.record_count(),
            strings: self.strings.record_count(),
            blob_blocks: self.blobs.record_count(),
        }
    }

    /// Close all four backends.
    ///
    /// Every backend is closed even if an earlier one fails; the first
    /// error is returned.
    pub fn close(&mut self) -> StoreResult<()> {
        let mut first: Option<StoreError> = None;
        for kind in BackendKind::ALL {
            if let Err(e) = self.get_mut(kind).close() {
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Create the four backends sized for `counts`.
///
/// Creation is sequential. If one fails, the handles already created are
/// dropped before the error is returned.
pub fn provision<P: BackendProvider>(
    provider: &P,
    counts: &ElementCounts,
    layout: &StoreLayout,
) -> CompileResult<StoreBackends<P::Backend>> {
    let create = |kind: BackendKind| -> CompileResult<P::Backend> {
        let capacity = kind.capacity(counts);
        let record_size = kind.record_size(layout);
        let backend = provider
            .create(kind.file_name(), capacity, record_size)
            .map_err(|source| CompileError::Provision {
                backend: kind.file_name(),
                source,
            })?;
        debug!(backend = kind.file_name(), capacity, record_size, "backend provisioned");
        Ok(backend)
    };

    let backends = StoreBackends {
        domains: create(BackendKind::Domain)?,
        parameters: create(BackendKind::Parameter)?,
        strings: create(BackendKind::String)?,
        blobs: create(BackendKind::Blob)?,
    };
    info!(
        domains = counts.domains,
        parameters = counts.parameters,
        strings = counts.strings,
        blob_blocks = counts.blob_blocks,
        "store provisioned"
    );
    Ok(backends)
}

/// Reopen the four backends of an existing store.
pub fn open_backends<P: BackendProvider>(provider: &P) -> CompileResult<StoreBackends<P::Backend>> {
    let open = |kind: BackendKind| -> CompileResult<P::Backend> {
        provider.open(kind.file_name()).map_err(|source| CompileError::Provision {
            backend: kind.file_name(),
            source,
        })
    };
    Ok(StoreBackends {
        domains: open(BackendKind::Domain)?,
        parameters: open(BackendKind::Parameter)?,
        strings: open(BackendKind::String)?,
        blobs: open(BackendKind::Blob)?,
    })
}
