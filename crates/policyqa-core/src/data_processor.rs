use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunker::{ChunkBuilder, ChunkingConfig, DocumentInfo};
use crate::error::{Error, Result};
use crate::extract::{doc_id_from_content, doc_id_from_path, extract, SourceFormat};
use crate::types::Chunk;

/// A file that was found but could not be turned into chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ProcessedCorpus {
    pub chunks: Vec<Chunk>,
    pub files_processed: usize,
    pub skipped: Vec<SkippedFile>,
}

pub struct DataProcessor {
    builder: ChunkBuilder,
}

impl DataProcessor {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        Ok(Self { builder: ChunkBuilder::new(config)? })
    }

    pub fn builder(&self) -> &ChunkBuilder {
        &self.builder
    }

    /// Chunk every supported file under `data_dir`, in path order.
    ///
    /// Unreadable or unparseable files are skipped and reported; they never
    /// abort the batch.
    pub fn process_directory(&self, data_dir: &Path) -> Result<ProcessedCorpus> {
        if !data_dir.is_dir() {
            return Err(Error::ingestion(data_dir, "not a directory"));
        }
        let files = list_source_files(data_dir);
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no supported documents found");
            return Ok(ProcessedCorpus::default());
        }

        let mut corpus = ProcessedCorpus::default();
        for (file_index, (path, format)) in files.iter().enumerate() {
            debug!(file = %path.display(), n = file_index + 1, of = files.len(), ?format, "processing");
            match self.process_file(path, *format) {
                Ok(chunks) => {
                    corpus.files_processed += 1;
                    corpus.chunks.extend(chunks);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping document");
                    corpus.skipped.push(SkippedFile { path: path.clone(), reason: e.to_string() });
                }
            }
        }
        info!(
            files = corpus.files_processed,
            skipped = corpus.skipped.len(),
            chunks = corpus.chunks.len(),
            "documents chunked"
        );
        Ok(corpus)
    }

    pub fn process_file(&self, path: &Path, format: SourceFormat) -> Result<Vec<Chunk>> {
        let extracted = extract(path, format)?;
        let doc = DocumentInfo {
            source: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            doc_id: doc_id_from_content(&extracted.text).unwrap_or_else(|| doc_id_from_path(path)),
            file_path: path.to_string_lossy().into_owned(),
        };
        Ok(self.builder.chunk(&extracted.text, extracted.structured, &doc))
    }
}

fn list_source_files(root: &Path) -> Vec<(PathBuf, SourceFormat)> {
    let mut files: Vec<(PathBuf, SourceFormat)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.into_path();
            SourceFormat::from_path(&path).map(|format| (path, format))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}
