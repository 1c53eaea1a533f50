use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::formats::PersistedDocument;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_documents: usize,
    pub by_subdomain: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

/// Storage contract for persisted documents. `insert` returns `false`
/// when the document's `source.url` is already present; it never
/// overwrites.
pub trait DocumentStore: Send {
    fn exists(&self, url: &str) -> bool;
    fn insert(&mut self, document: PersistedDocument) -> anyhow::Result<bool>;
    fn statistics(&self) -> StoreStatistics;
    fn unprocessed(&self) -> Vec<PersistedDocument>;
    fn mark_processed(&mut self, doc_id: &str) -> anyhow::Result<()>;
}

/// In-memory store, used by tests and as the reference semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Vec<PersistedDocument>,
    by_url: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[PersistedDocument] {
        &self.documents
    }
}

impl DocumentStore for MemoryStore {
    fn exists(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    fn insert(&mut self, document: PersistedDocument) -> anyhow::Result<bool> {
        if self.exists(&document.source.url) {
            tracing::warn!(url = %document.source.url, "document already exists; insert skipped");
            return Ok(false);
        }
        self.by_url
            .insert(document.source.url.clone(), self.documents.len());
        self.documents.push(document);
        Ok(true)
    }

    fn statistics(&self) -> StoreStatistics {
        compute_statistics(&self.documents)
    }

    fn unprocessed(&self) -> Vec<PersistedDocument> {
        self.documents
            .iter()
            .filter(|doc| !doc.processed_for_embeddings)
            .cloned()
            .collect()
    }

    fn mark_processed(&mut self, doc_id: &str) -> anyhow::Result<()> {
        for doc in &mut self.documents {
            if doc.id == doc_id {
                doc.processed_for_embeddings = true;
                return Ok(());
            }
        }
        anyhow::bail!("no document with id {doc_id}")
    }
}

/// File-backed store: one JSON document per line. Inserts append;
/// `mark_processed` rewrites the file, which is fine at documentation
/// corpus scale.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonlStore {
    /// Opens the store, loading any existing records; a missing file is
    /// an empty store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let mut inner = MemoryStore::new();

        match OpenOptions::new().read(true).open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line
                        .with_context(|| format!("read store line: {}", path.display()))?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let document: PersistedDocument = serde_json::from_str(&line)
                        .with_context(|| format!("parse store record: {}", path.display()))?;
                    inner.insert(document)?;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("open document store: {}", path.display()));
            }
        }

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all_documents(&self) -> &[PersistedDocument] {
        self.inner.documents()
    }

    fn append(&self, document: &PersistedDocument) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store dir: {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open document store: {}", self.path.display()))?;
        serde_json::to_writer(&mut file, document).context("serialize document record")?;
        file.write_all(b"\n").context("write document newline")?;
        Ok(())
    }

    fn rewrite(&self) -> anyhow::Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("create tmp store: {}", tmp_path.display()))?;
        for document in self.inner.documents() {
            serde_json::to_writer(&mut tmp, document).context("serialize document record")?;
            tmp.write_all(b"\n").context("write document newline")?;
        }
        tmp.flush().context("flush tmp store")?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replace store: {}", self.path.display()))?;
        Ok(())
    }
}

impl DocumentStore for JsonlStore {
    fn exists(&self, url: &str) -> bool {
        self.inner.exists(url)
    }

    fn insert(&mut self, document: PersistedDocument) -> anyhow::Result<bool> {
        if !self.inner.insert(document.clone())? {
            return Ok(false);
        }
        self.append(&document)?;
        Ok(true)
    }

    fn statistics(&self) -> StoreStatistics {
        self.inner.statistics()
    }

    fn unprocessed(&self) -> Vec<PersistedDocument> {
        self.inner.unprocessed()
    }

    fn mark_processed(&mut self, doc_id: &str) -> anyhow::Result<()> {
        self.inner.mark_processed(doc_id)?;
        self.rewrite()
    }
}

fn compute_statistics(documents: &[PersistedDocument]) -> StoreStatistics {
    let mut stats = StoreStatistics {
        total_documents: documents.len(),
        ..Default::default()
    };
    for doc in documents {
        *stats.by_subdomain.entry(doc.subdomain.clone()).or_default() += 1;
        *stats.by_type.entry(doc.doc_type.clone()).or_default() += 1;
    }
    stats
}
