use std::fs;
use std::path::{Path, PathBuf};

use cfgc_store::{BackendProvider, FileProvider, FILE_HEADER_LEN};
use cfgc_types::StoreLayout;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blob::{BlobSource, FsBlobSource};
use crate::counter::{count_elements, ElementCounts};
use crate::document::Document;
use crate::encoder::encode_document;
use crate::error::{CompileError, CompileResult};
use crate::provision::{provision, BackendKind};

/// Prefix of the temporary directory a store is staged in.
const STAGING_PREFIX: &str = ".cfgc-staging-";

/// Outcome of a successful compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileReport {
    pub counts: ElementCounts,
    pub layout: StoreLayout,
}

impl CompileReport {
    pub fn new(counts: ElementCounts, layout: StoreLayout) -> Self {
        Self { counts, layout }
    }

    /// Record bytes held by one backend, excluding any container header.
    pub fn payload_bytes(&self, kind: BackendKind) -> u64 {
        kind.capacity(&self.counts) as u64 * kind.record_size(&self.layout) as u64
    }

    /// Size of the file a [`FileProvider`] writes for one backend.
    pub fn file_bytes(&self, kind: BackendKind) -> u64 {
        FILE_HEADER_LEN + self.payload_bytes(kind)
    }

    /// Combined size of all four backend files.
    pub fn total_file_bytes(&self) -> u64 {
        BackendKind::ALL.iter().map(|k| self.file_bytes(*k)).sum()
    }
}

/// Two-pass compiler from a definition document to a configuration store.
///
/// ```no_run
/// use cfgc_compiler::{Compiler, Document};
/// use cfgc_types::StoreLayout;
///
/// let doc = Document::load("config.xml".as_ref())?;
/// let compiler = Compiler::new(StoreLayout::default())?;
/// let report = compiler.compile_to_dir(&doc, "store".as_ref(), false)?;
/// println!("{} parameters", report.counts.parameters);
/// # Ok::<(), cfgc_compiler::CompileError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Compiler<S = FsBlobSource> {
    layout: StoreLayout,
    source: S,
}

impl Compiler<FsBlobSource> {
    /// Compiler reading blobs from the filesystem.
    pub fn new(layout: StoreLayout) -> CompileResult<Self> {
        Self::with_source(layout, FsBlobSource)
    }
}

impl<S: BlobSource> Compiler<S> {
    /// Compiler reading blobs through `source`.
    pub fn with_source(layout: StoreLayout, source: S) -> CompileResult<Self> {
        layout.validate()?;
        Ok(Self { layout, source })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Run only the counting pass.
    pub fn count(&self, doc: &Document) -> CompileResult<ElementCounts> {
        count_elements(doc, &self.source, &self.layout)
    }

    /// Count, provision and encode `doc` into backends created by `provider`.
    ///
    /// Blob sources are read once per pass and must not change in between.
    /// On error the backends created so far are dropped without being
    /// closed; their contents must be discarded by the caller.
    pub fn compile<P: BackendProvider>(
        &self,
        doc: &Document,
        provider: &P,
    ) -> CompileResult<CompileReport> {
        let counts = self.count(doc)?;
        info!(
            domains = counts.domains,
            parameters = counts.parameters,
            strings = counts.strings,
            blob_blocks = counts.blob_blocks,
            "counting pass complete"
        );

        let mut backends = provision(provider, &counts, &self.layout)?;
        let written = encode_document(doc, &mut backends, &self.source, &self.layout)?;
        verify_passes(&counts, &written)?;
        backends.close()?;

        info!(parameters = written.parameters, "store compiled");
        Ok(CompileReport::new(counts, self.layout))
    }

    /// Compile into the directory `out_dir`, one file per backend.
    ///
    /// The store is built in a staging directory next to `out_dir` and
    /// renamed into place only once every backend is closed. An existing
    /// `out_dir` is replaced when `overwrite` is set and is otherwise an
    /// error. On failure `out_dir` is left untouched.
    pub fn compile_to_dir(
        &self,
        doc: &Document,
        out_dir: &Path,
        overwrite: bool,
    ) -> CompileResult<CompileReport> {
        if out_dir.exists() && !overwrite {
            return Err(CompileError::OutputExists(out_dir.to_path_buf()));
        }

        let parent = match out_dir.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)?;
        debug!(staging = %staging.path().display(), "staging store");

        let provider = FileProvider::new(staging.path())?;
        let report = self.compile(doc, &provider)?;

        if out_dir.is_dir() {
            fs::remove_dir_all(out_dir)?;
        } else if out_dir.exists() {
            fs::remove_file(out_dir)?;
        }
        fs::rename(staging.path(), out_dir)?;
        info!(output = %out_dir.display(), bytes = report.total_file_bytes(), "store written");
        Ok(report)
    }
}

/// Check that the encoder wrote exactly what the counter sized.
fn verify_passes(counted: &ElementCounts, written: &ElementCounts) -> CompileResult<()> {
    for kind in BackendKind::ALL {
        let (counted, written) = (kind.capacity(counted), kind.capacity(written));
        if counted != written {
            return Err(CompileError::PassDivergence {
                backend: kind.file_name(),
                counted,
                written,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobSource;
    use cfgc_store::MemoryProvider;

    const DOC: &str = r#"
<config>
  <domain name="net">
    <param><param_name>port</param_name><type>uint32</type><value>8080</value></param>
    <param><param_name>host</param_name><type>string</type><value>localhost</value></param>
  </domain>
</config>"#;

    #[test]
    fn compile_into_memory() {
        let doc = Document::parse_str(DOC, "/cfg").unwrap();
        let compiler = Compiler::with_source(StoreLayout::default(), MemoryBlobSource::new()).unwrap();
        let provider = MemoryProvider::new();
        let report = compiler.compile(&doc, &provider).unwrap();

        assert_eq!(report.counts.domains, 1);
        assert_eq!(report.counts.parameters, 2);
        assert_eq!(report.counts.strings, 1);
        assert_eq!(report.payload_bytes(BackendKind::Parameter), 128);
        assert_eq!(report.file_bytes(BackendKind::Blob), 8);
        assert_eq!(provider.names().len(), 4);
    }

    #[test]
    fn invalid_layout_rejected() {
        let layout = StoreLayout {
            blob_block_len: 0,
            ..StoreLayout::default()
        };
        assert!(matches!(
            Compiler::new(layout).unwrap_err(),
            CompileError::Layout(_)
        ));
    }

    #[test]
    fn divergence_detected() {
        let counted = ElementCounts {
            domains: 1,
            parameters: 2,
            strings: 1,
            blob_blocks: 0,
        };
        let written = ElementCounts {
            parameters: 1,
            ..counted
        };
        assert!(verify_passes(&counted, &counted).is_ok());
        match verify_passes(&counted, &written).unwrap_err() {
            CompileError::PassDivergence {
                backend,
                counted,
                written,
            } => {
                assert_eq!(backend, "PARAM.BIN");
                assert_eq!((counted, written), (2, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn existing_output_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("store");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("stale"), b"x").unwrap();

        let doc = Document::parse_str(DOC, dir.path()).unwrap();
        let compiler = Compiler::new(StoreLayout::default()).unwrap();
        assert!(matches!(
            compiler.compile_to_dir(&doc, &out, false).unwrap_err(),
            CompileError::OutputExists(_)
        ));
        assert!(out.join("stale").exists());

        compiler.compile_to_dir(&doc, &out, true).unwrap();
        assert!(!out.join("stale").exists());
        assert!(out.join("PARAM.BIN").is_file());
    }

    #[test]
    fn staging_directory_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("store");
        let doc = Document::parse_str(DOC, dir.path()).unwrap();
        Compiler::new(StoreLayout::default())
            .unwrap()
            .compile_to_dir(&doc, &out, false)
            .unwrap();

        let entries: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["store".to_string()]);
    }
}
