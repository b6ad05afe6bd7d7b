//! Second pass: walk the document again and write every record.
//!
//! The traversal order is identical to [`count_elements`], so the indices
//! handed out here stay inside the capacities the counter sized.
//!
//! [`count_elements`]: crate::counter::count_elements

use std::path::Path;

use cfgc_store::{RecordBackend, StoreError};
use cfgc_types::{
    encode_string, DomainRecord, ParamType, ParameterRecord, ParameterValue, StoreLayout,
    TypeError,
};
use tracing::{debug, warn};

use crate::access::AccessTracker;
use crate::blob::{block_count, load_blob, write_blob_blocks, BlobSource};
use crate::counter::ElementCounts;
use crate::document::{DocNode, Document};
use crate::element::{ElementKind, DOMAIN_NAME_ATTRIBUTE};
use crate::error::{CompileError, CompileResult};
use crate::provision::{BackendKind, StoreBackends};

/// Whether a domain record has been written yet.
///
/// The domain index only advances when the *next* domain element is seen,
/// so every parameter up to that point belongs to the open domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DomainState {
    #[default]
    NoDomainOpen,
    DomainOpen(u32),
}

impl DomainState {
    /// Index the next domain record is written at.
    fn next_index(self) -> u32 {
        match self {
            Self::NoDomainOpen => 0,
            Self::DomainOpen(current) => current + 1,
        }
    }
}

/// Mutable state of one encoding pass.
#[derive(Clone, Debug, Default)]
pub struct EncoderContext {
    domain: DomainState,
    parameter_index: u32,
    string_index: u32,
    blob_index: u32,
    access: AccessTracker,
    pending_name: Option<String>,
    pending_type: Option<ParamType>,
}

impl EncoderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain_state(&self) -> DomainState {
        self.domain
    }

    /// Records written so far, per backend.
    pub fn written(&self) -> ElementCounts {
        ElementCounts {
            domains: self.domain.next_index(),
            parameters: self.parameter_index,
            strings: self.string_index,
            blob_blocks: self.blob_index,
        }
    }
}

/// Write every record of `doc` into `backends`.
///
/// Returns how many records went into each backend.
pub fn encode_document<B, S>(
    doc: &Document,
    backends: &mut StoreBackends<B>,
    source: &S,
    layout: &StoreLayout,
) -> CompileResult<ElementCounts>
where
    B: RecordBackend,
    S: BlobSource + ?Sized,
{
    let mut ctx = EncoderContext::new();
    encode_with_context(doc, backends, source, layout, &mut ctx)?;
    Ok(ctx.written())
}

/// Like [`encode_document`], threading a caller-owned context.
pub fn encode_with_context<B, S>(
    doc: &Document,
    backends: &mut StoreBackends<B>,
    source: &S,
    layout: &StoreLayout,
    ctx: &mut EncoderContext,
) -> CompileResult<()>
where
    B: RecordBackend,
    S: BlobSource + ?Sized,
{
    let mut encoder = Encoder {
        backends,
        source,
        layout,
        base_dir: doc.base_dir(),
        ctx,
    };
    encoder.walk(std::slice::from_ref(doc.root()))
}

struct Encoder<'a, B, S: ?Sized> {
    backends: &'a mut StoreBackends<B>,
    source: &'a S,
    layout: &'a StoreLayout,
    base_dir: &'a Path,
    ctx: &'a mut EncoderContext,
}

impl<B: RecordBackend, S: BlobSource + ?Sized> Encoder<'_, B, S> {
    fn walk(&mut self, siblings: &[DocNode]) -> CompileResult<()> {
        for node in siblings {
            if !node.is_element() {
                continue;
            }
            if let Some(kind) = ElementKind::classify(&node.name) {
                self.on_element(kind, node)?;
            }
            self.walk(&node.children)?;
        }
        Ok(())
    }

    fn on_element(&mut self, kind: ElementKind, node: &DocNode) -> CompileResult<()> {
        match kind {
            ElementKind::Domain => {
                let name = node.attribute(DOMAIN_NAME_ATTRIBUTE).ok_or(
                    CompileError::MissingAttribute {
                        element: kind.tag(),
                        attribute: DOMAIN_NAME_ATTRIBUTE,
                    },
                )?;
                self.open_domain(name)?;
            }
            ElementKind::ParamName => {
                self.ctx.pending_name = Some(node.text_content());
            }
            ElementKind::Type => {
                let token = node.text_content();
                let ty = ParamType::resolve(&token).map_err(|e| match e {
                    TypeError::UnknownParamType(token) => CompileError::UnsupportedType {
                        token,
                        parameter: self.ctx.pending_name.clone(),
                    },
                    other => CompileError::Layout(other),
                })?;
                self.ctx.pending_type = Some(ty);
            }
            ElementKind::Value => self.write_value(&node.text_content())?,
            ElementKind::Read | ElementKind::Write => {
                let token = node.text_content();
                let tracker = &mut self.ctx.access;
                let result = if kind == ElementKind::Read {
                    tracker.set_read(&token)
                } else {
                    tracker.set_write(&token)
                };
                result.map_err(|_| CompileError::InvalidAccessSetting {
                    element: kind.tag(),
                    token,
                    parameter: self.ctx.pending_name.clone(),
                })?;
            }
            ElementKind::Component => {
                warn!(
                    parameter = self.ctx.pending_name.as_deref().unwrap_or(""),
                    "per-component access policy ignored; flags apply to all components"
                );
            }
            ElementKind::AccessPolicy => {}
        }
        Ok(())
    }

    fn open_domain(&mut self, name: &str) -> CompileResult<()> {
        let index = self.ctx.domain.next_index();
        let record = DomainRecord::new(name).encode(self.layout);
        self.backends
            .domains
            .write_record(index, &record)
            .map_err(|source| CompileError::Backend {
                backend: BackendKind::Domain.file_name(),
                parameter: None,
                source,
            })?;
        self.ctx.domain = DomainState::DomainOpen(index);
        debug!(index, name, "domain written");
        Ok(())
    }

    fn write_value(&mut self, text: &str) -> CompileResult<()> {
        let name = self.ctx.pending_name.take().ok_or(CompileError::ValueWithoutName)?;
        let ty = self
            .ctx
            .pending_type
            .take()
            .ok_or_else(|| CompileError::ValueWithoutType {
                parameter: name.clone(),
            })?;
        let domain_index = match self.ctx.domain {
            DomainState::DomainOpen(index) => index,
            DomainState::NoDomainOpen => {
                return Err(CompileError::ParameterOutsideDomain { parameter: name })
            }
        };

        let value = match ty {
            ParamType::Integer32 => {
                let parsed = parse_unsigned(text)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| numeric_error(&name, ty, text))?;
                ParameterValue::Integer32(parsed)
            }
            ParamType::Integer64 => {
                let parsed = parse_unsigned(text).ok_or_else(|| numeric_error(&name, ty, text))?;
                ParameterValue::Integer64(parsed)
            }
            ParamType::String => self.write_string(&name, text)?,
            ParamType::Blob => self.write_blob(&name, text)?,
        };

        let (read_access, write_access) = self.ctx.access.take();
        let record = ParameterRecord {
            name,
            domain_index,
            read_access,
            write_access,
            value,
        };
        let index = self.ctx.parameter_index;
        self.backends
            .parameters
            .write_record(index, &record.encode(self.layout))
            .map_err(|source| backend_error(BackendKind::Parameter, &record.name, source))?;
        self.ctx.parameter_index += 1;
        debug!(
            index,
            domain = domain_index,
            name = %record.name,
            ty = %ty,
            "parameter written"
        );
        Ok(())
    }

    fn write_string(&mut self, name: &str, text: &str) -> CompileResult<ParameterValue> {
        let index = self.ctx.string_index;
        let (record, size) = encode_string(text, self.layout.string_record_size());
        self.backends
            .strings
            .write_record(index, &record)
            .map_err(|source| backend_error(BackendKind::String, name, source))?;
        self.ctx.string_index += 1;
        Ok(ParameterValue::String { index, size })
    }

    fn write_blob(&mut self, name: &str, reference: &str) -> CompileResult<ParameterValue> {
        let (path, content) = load_blob(self.source, self.base_dir, reference, Some(name))?;
        let blobs = &mut self.backends.blobs;
        let expected = block_count(content.len(), blobs.record_size());
        let index = self.ctx.blob_index;

        let written = write_blob_blocks(blobs, index, &content)
            .map_err(|source| backend_error(BackendKind::Blob, name, source))?;
        debug_assert_eq!(written, expected);
        self.ctx.blob_index += written;
        debug!(path = %path.display(), index, blocks = written, size = content.len(), "blob written");

        Ok(ParameterValue::Blob {
            index,
            number_of_blocks: written,
            // load_blob bounds the length to u32
            size: content.len() as u32,
        })
    }
}

/// Parse decimal or `0x`-prefixed hexadecimal unsigned text.
pub fn parse_unsigned(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn numeric_error(name: &str, ty: ParamType, text: &str) -> CompileError {
    CompileError::NumericParse {
        parameter: name.to_string(),
        ty,
        text: text.to_string(),
    }
}

fn backend_error(kind: BackendKind, parameter: &str, source: StoreError) -> CompileError {
    CompileError::Backend {
        backend: kind.file_name(),
        parameter: Some(parameter.to_string()),
        source,
    }
}
