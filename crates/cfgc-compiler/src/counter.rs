//! First pass: size the store without touching any backend.

use std::path::Path;

use cfgc_types::{ParamType, StoreLayout, TypeError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blob::{block_count, load_blob, BlobSource};
use crate::document::{DocNode, Document};
use crate::element::ElementKind;
use crate::error::{CompileError, CompileResult};
use crate::provision::BackendKind;

/// Record totals for the four backends of a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub domains: u32,
    pub parameters: u32,
    pub strings: u32,
    pub blob_blocks: u32,
}

/// Count the records `doc` compiles to.
///
/// Walks the tree depth-first in document order, the same order the
/// encoder uses. Blob sources are read so their block counts are exact.
pub fn count_elements<S: BlobSource + ?Sized>(
    doc: &Document,
    source: &S,
    layout: &StoreLayout,
) -> CompileResult<ElementCounts> {
    let mut counter = Counter {
        source,
        base_dir: doc.base_dir(),
        block_len: layout.blob_block_size(),
        counts: ElementCounts::default(),
        last_param_name: None,
    };
    counter.walk(std::slice::from_ref(doc.root()))?;
    debug!(
        domains = counter.counts.domains,
        parameters = counter.counts.parameters,
        strings = counter.counts.strings,
        blob_blocks = counter.counts.blob_blocks,
        "element count complete"
    );
    Ok(counter.counts)
}

struct Counter<'a, S: ?Sized> {
    source: &'a S,
    base_dir: &'a Path,
    block_len: usize,
    counts: ElementCounts,
    /// Only used to give errors a parameter name.
    last_param_name: Option<String>,
}

impl<S: BlobSource + ?Sized> Counter<'_, S> {
    fn walk(&mut self, siblings: &[DocNode]) -> CompileResult<()> {
        for (position, node) in siblings.iter().enumerate() {
            if !node.is_element() {
                continue;
            }
            match ElementKind::classify(&node.name) {
                Some(ElementKind::Domain) => {
                    tally(&mut self.counts.domains, 1, BackendKind::Domain, &None)?
                }
                Some(ElementKind::ParamName) => self.last_param_name = Some(node.text_content()),
                Some(ElementKind::Type) => self.count_parameter(node, &siblings[position + 1..])?,
                _ => {}
            }
            self.walk(&node.children)?;
        }
        Ok(())
    }

    fn count_parameter(&mut self, type_node: &DocNode, following: &[DocNode]) -> CompileResult<()> {
        let token = type_node.text_content();
        let ty = ParamType::resolve(&token).map_err(|e| match e {
            TypeError::UnknownParamType(token) => CompileError::UnsupportedType {
                token,
                parameter: self.last_param_name.clone(),
            },
            other => CompileError::Layout(other),
        })?;

        tally(&mut self.counts.parameters, 1, BackendKind::Parameter, &self.last_param_name)?;
        match ty {
            ParamType::Integer32 | ParamType::Integer64 => {}
            ParamType::String => {
                tally(&mut self.counts.strings, 1, BackendKind::String, &self.last_param_name)?
            }
            ParamType::Blob => {
                let value = following
                    .iter()
                    .find(|n| n.is_element() && ElementKind::classify(&n.name) == Some(ElementKind::Value))
                    .ok_or_else(|| CompileError::MissingBlobValue {
                        parameter: self.last_param_name.clone(),
                    })?;
                let (path, content) = load_blob(
                    self.source,
                    self.base_dir,
                    &value.text_content(),
                    self.last_param_name.as_deref(),
                )?;
                let blocks = block_count(content.len(), self.block_len);
                debug!(path = %path.display(), size = content.len(), blocks, "blob sized");
                tally(&mut self.counts.blob_blocks, blocks, BackendKind::Blob, &self.last_param_name)?;
            }
        }
        Ok(())
    }
}

/// Add `by` records to a backend total, failing once it no longer fits a record index.
fn tally(total: &mut u32, by: u32, kind: BackendKind, parameter: &Option<String>) -> CompileResult<()> {
    *total = total
        .checked_add(by)
        .ok_or_else(|| CompileError::CountOverflow {
            backend: kind.file_name(),
            parameter: parameter.clone(),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobSource;

    fn param(name: &str, ty: &str, value: &str) -> DocNode {
        DocNode::element("param")
            .with_child(DocNode::element("param_name").with_text(name))
            .with_child(DocNode::element("type").with_text(ty))
            .with_child(DocNode::element("value").with_text(value))
    }

    fn doc(root: DocNode) -> Document {
        Document::new(root, "/cfg")
    }

    #[test]
    fn counts_every_kind() {
        let mut source = MemoryBlobSource::new();
        source.insert("/cfg/a.bin", vec![7u8; 100]);
        let root = DocNode::element("config")
            .with_child(
                DocNode::element("domain")
                    .with_attr("name", "A")
                    .with_child(param("x", "uint32", "1"))
                    .with_child(param("y", "string", "s")),
            )
            .with_child(
                DocNode::element("domain")
                    .with_attr("name", "B")
                    .with_child(param("z", "uint64", "2"))
                    .with_child(param("w", "blob", "a.bin")),
            );

        let layout = StoreLayout::default();
        let counts = count_elements(&doc(root), &source, &layout).unwrap();
        assert_eq!(
            counts,
            ElementCounts {
                domains: 2,
                parameters: 4,
                strings: 1,
                // 100 bytes + terminator over 64-byte blocks
                blob_blocks: 2,
            }
        );
    }

    #[test]
    fn counting_is_repeatable() {
        let root = DocNode::element("domain").with_child(param("x", "string", "v"));
        let d = doc(root);
        let source = MemoryBlobSource::new();
        let layout = StoreLayout::default();
        let first = count_elements(&d, &source, &layout).unwrap();
        let second = count_elements(&d, &source, &layout).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_type_is_fatal() {
        let root = DocNode::element("domain").with_child(param("ratio", "float", "0.5"));
        let err = count_elements(&doc(root), &MemoryBlobSource::new(), &StoreLayout::default())
            .unwrap_err();
        match err {
            CompileError::UnsupportedType { token, parameter } => {
                assert_eq!(token, "float");
                assert_eq!(parameter.as_deref(), Some("ratio"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_blob_file_is_fatal() {
        let root = DocNode::element("domain").with_child(param("cert", "blob", "cert.pem"));
        let err = count_elements(&doc(root), &MemoryBlobSource::new(), &StoreLayout::default())
            .unwrap_err();
        match err {
            CompileError::BlobRead { path, parameter, .. } => {
                assert_eq!(path, Path::new("/cfg/cert.pem"));
                assert_eq!(parameter.as_deref(), Some("cert"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn block_total_overflow_is_fatal() {
        let mut source = MemoryBlobSource::new();
        source.insert("/cfg/big.bin", vec![1u8; 200]);
        let mut counter = Counter {
            source: &source,
            base_dir: Path::new("/cfg"),
            block_len: 64,
            counts: ElementCounts {
                domains: 1,
                blob_blocks: u32::MAX - 1,
                ..ElementCounts::default()
            },
            last_param_name: None,
        };
        let root = DocNode::element("domain").with_child(param("big", "blob", "big.bin"));
        let err = counter.walk(std::slice::from_ref(&root)).unwrap_err();
        match err {
            CompileError::CountOverflow { backend, parameter } => {
                assert_eq!(backend, "BLOB.BIN");
                assert_eq!(parameter.as_deref(), Some("big"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.counts.blob_blocks, u32::MAX - 1);
    }

    #[test]
    fn domain_total_overflow_is_fatal() {
        let source = MemoryBlobSource::new();
        let mut counter = Counter {
            source: &source,
            base_dir: Path::new("/cfg"),
            block_len: 64,
            counts: ElementCounts {
                domains: u32::MAX,
                ..ElementCounts::default()
            },
            last_param_name: None,
        };
        let err = counter
            .walk(std::slice::from_ref(&DocNode::element("domain")))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::CountOverflow {
                backend: "DOMAIN.BIN",
                parameter: None
            }
        ));
    }

    #[test]
    fn blob_without_value_is_fatal() {
        let root = DocNode::element("domain").with_child(
            DocNode::element("param").with_child(DocNode::element("type").with_text("blob")),
        );
        let err = count_elements(&doc(root), &MemoryBlobSource::new(), &StoreLayout::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::MissingBlobValue { .. }));
    }

    #[test]
    fn blob_value_is_next_value_sibling() {
        let mut source = MemoryBlobSource::new();
        source.insert("/cfg/second.bin", vec![1u8; 200]);
        let root = DocNode::element("domain").with_child(
            DocNode::element("param")
                .with_child(DocNode::element("value").with_text("first.bin"))
                .with_child(DocNode::element("type").with_text("blob"))
                .with_child(DocNode::element("read").with_text("true"))
                .with_child(DocNode::element("value").with_text("second.bin")),
        );
        let counts = count_elements(&doc(root), &source, &StoreLayout::default()).unwrap();
        assert_eq!(counts.blob_blocks, 4);
    }

    #[test]
    fn nested_domains_are_counted() {
        let root = DocNode::element("config").with_child(
            DocNode::element("group")
                .with_child(DocNode::element("domain").with_attr("name", "inner")),
        );
        let counts =
            count_elements(&doc(root), &MemoryBlobSource::new(), &StoreLayout::default()).unwrap();
        assert_eq!(counts.domains, 1);
        assert_eq!(counts.parameters, 0);
    }
}
