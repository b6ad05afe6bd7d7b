//! Read back a compiled store.
//!
//! [`StoreReader`] decodes the fixed records of the four backends and
//! follows the string and blob references held by parameter records, the
//! way a runtime configuration service consumes the store.

use cfgc_store::{BackendProvider, RecordBackend};
use cfgc_types::{
    decode_string, AccessRights, DomainRecord, ParamType, ParameterRecord, ParameterValue,
    StoreLayout, TypeError,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::counter::ElementCounts;
use crate::error::{CompileError, CompileResult};
use crate::provision::{open_backends, BackendKind, StoreBackends};

/// A parameter value with its string or blob payload loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    Integer32(u32),
    Integer64(u64),
    String(String),
    /// Stored bytes, terminator included.
    Blob(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub index: u32,
    pub name: String,
    pub param_type: ParamType,
    pub read: AccessRights,
    pub write: AccessRights,
    pub value: ResolvedValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub index: u32,
    pub name: String,
    pub parameters: Vec<ParameterSnapshot>,
}

/// Fully decoded contents of a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub layout: StoreLayout,
    pub counts: ElementCounts,
    pub domains: Vec<DomainSnapshot>,
}

/// Reader over the four backends of a compiled store.
#[derive(Debug)]
pub struct StoreReader<B> {
    backends: StoreBackends<B>,
    layout: StoreLayout,
}

impl<B: RecordBackend> StoreReader<B> {
    /// Open a store, recovering its layout from the backend record sizes.
    pub fn open<P>(provider: &P) -> CompileResult<Self>
    where
        P: BackendProvider<Backend = B>,
    {
        let backends = open_backends(provider)?;
        let layout = StoreLayout::from_record_sizes(
            backends.domains.record_size(),
            backends.parameters.record_size(),
            backends.strings.record_size(),
            backends.blobs.record_size(),
        )?;
        debug!(?layout, "store opened");
        Ok(Self { backends, layout })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Record count of each backend.
    pub fn counts(&self) -> ElementCounts {
        self.backends.capacities()
    }

    pub fn domain(&mut self, index: u32) -> CompileResult<DomainRecord> {
        let bytes = self.backends.domains.read_record(index)?;
        DomainRecord::decode(&bytes, &self.layout)
            .map_err(|source| record_error(BackendKind::Domain, index, source))
    }

    pub fn domains(&mut self) -> CompileResult<Vec<DomainRecord>> {
        (0..self.counts().domains).map(|i| self.domain(i)).collect()
    }

    pub fn parameter(&mut self, index: u32) -> CompileResult<ParameterRecord> {
        let bytes = self.backends.parameters.read_record(index)?;
        ParameterRecord::decode(&bytes, &self.layout)
            .map_err(|source| record_error(BackendKind::Parameter, index, source))
    }

    pub fn parameters(&mut self) -> CompileResult<Vec<ParameterRecord>> {
        (0..self.counts().parameters).map(|i| self.parameter(i)).collect()
    }

    /// Load the string record at `index`. `size` counts the terminator.
    pub fn string_value(&mut self, index: u32, size: u32) -> CompileResult<String> {
        if size == 0 || size as usize > self.layout.string_record_size() {
            return Err(CompileError::InconsistentStore(format!(
                "string {index} declares size {size}, record holds {}",
                self.layout.string_record_size()
            )));
        }
        let record = self.backends.strings.read_record(index)?;
        Ok(decode_string(&record[..size as usize]))
    }

    /// Reassemble the blob starting at block `index`.
    pub fn blob_value(&mut self, index: u32, number_of_blocks: u32, size: u32) -> CompileResult<Vec<u8>> {
        let block_len = self.layout.blob_block_size();
        let capacity = number_of_blocks as u64 * block_len as u64;
        let stored = self.backends.blobs.record_count();
        let in_bounds = index
            .checked_add(number_of_blocks)
            .is_some_and(|end| end <= stored);
        if number_of_blocks == 0 || size as u64 > capacity || !in_bounds {
            return Err(CompileError::InconsistentStore(format!(
                "blob at block {index} declares {size} bytes in {number_of_blocks} blocks of {block_len} ({stored} blocks stored)"
            )));
        }

        let mut data = Vec::with_capacity(capacity as usize);
        for block in index..index + number_of_blocks {
            data.extend(self.backends.blobs.read_record(block)?);
        }
        data.truncate(size as usize);
        Ok(data)
    }

    /// Load the payload a parameter refers to.
    pub fn resolve(&mut self, record: &ParameterRecord) -> CompileResult<ResolvedValue> {
        Ok(match record.value {
            ParameterValue::Integer32(v) => ResolvedValue::Integer32(v),
            ParameterValue::Integer64(v) => ResolvedValue::Integer64(v),
            ParameterValue::String { index, size } => {
                ResolvedValue::String(self.string_value(index, size)?)
            }
            ParameterValue::Blob {
                index,
                number_of_blocks,
                size,
            } => ResolvedValue::Blob(self.blob_value(index, number_of_blocks, size)?),
        })
    }

    /// Decode the whole store, grouping parameters under their domains.
    pub fn snapshot(&mut self) -> CompileResult<StoreSnapshot> {
        let mut domains: Vec<DomainSnapshot> = self
            .domains()?
            .into_iter()
            .zip(0u32..)
            .map(|(domain, index)| DomainSnapshot {
                index,
                name: domain.name,
                parameters: Vec::new(),
            })
            .collect();

        for (record, index) in self.parameters()?.into_iter().zip(0u32..) {
            let value = self.resolve(&record)?;
            let domain = domains
                .get_mut(record.domain_index as usize)
                .ok_or_else(|| {
                    CompileError::InconsistentStore(format!(
                        "parameter {:?} references domain {} of {}",
                        record.name,
                        record.domain_index,
                        self.backends.domains.record_count()
                    ))
                })?;
            domain.parameters.push(ParameterSnapshot {
                index,
                param_type: record.param_type(),
                name: record.name,
                read: record.read_access,
                write: record.write_access,
                value,
            });
        }

        Ok(StoreSnapshot {
            layout: self.layout,
            counts: self.counts(),
            domains,
        })
    }

    /// Close every backend.
    pub fn close(mut self) -> CompileResult<()> {
        self.backends.close()?;
        Ok(())
    }
}

fn record_error(kind: BackendKind, index: u32, source: TypeError) -> CompileError {
    CompileError::Record {
        backend: kind.file_name(),
        index,
        source,
    }
}
