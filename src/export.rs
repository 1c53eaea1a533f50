use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::ExportArgs;
use crate::formats::PersistedDocument;
use crate::store::JsonlStore;

/// Dumps the stored corpus as plain-text files grouped by subdomain, for
/// eyeballing what the pipeline actually captured.
pub fn run(args: ExportArgs) -> anyhow::Result<()> {
    let out_dir = PathBuf::from(&args.out);
    if out_dir.exists() {
        anyhow::bail!("export output directory already exists: {}", out_dir.display());
    }

    let store = JsonlStore::open(&args.store)
        .with_context(|| format!("open document store: {}", args.store))?;

    let mut exported = 0usize;
    let mut used_paths = HashSet::new();
    for document in store.all_documents() {
        let subdomain_dir = out_dir.join(&document.subdomain);
        std::fs::create_dir_all(&subdomain_dir)
            .with_context(|| format!("create subdomain dir: {}", subdomain_dir.display()))?;

        let path = unique_path(&subdomain_dir, &file_stem(document), &mut used_paths);
        write_document(&path, document)
            .with_context(|| format!("export document: {}", path.display()))?;
        exported += 1;
    }

    tracing::info!(exported, out = %out_dir.display(), "export finished");
    Ok(())
}

/// Filename from the title, falling back to the URL tail, falling back to
/// the document id.
fn file_stem(document: &PersistedDocument) -> String {
    let from_title: String = document
        .content
        .title
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect();
    if !from_title.is_empty() {
        return from_title;
    }

    let from_url = document
        .source
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned();
    if !from_url.is_empty() {
        return from_url;
    }

    document.id.clone()
}

/// Distinct documents can share a title; later ones get a counter suffix
/// so one collision cannot abort the whole export.
fn unique_path(dir: &Path, stem: &str, used: &mut HashSet<PathBuf>) -> PathBuf {
    let mut path = dir.join(format!("{stem}.txt"));
    let mut counter = 2;
    while !used.insert(path.clone()) {
        path = dir.join(format!("{stem}_{counter}.txt"));
        counter += 1;
    }
    path
}

fn write_document(path: &Path, document: &PersistedDocument) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create export file: {}", path.display()))?;

    writeln!(file, "Title: {}", document.content.title)?;
    writeln!(file, "URL: {}", document.source.url)?;
    writeln!(file, "Type: {}", document.doc_type)?;
    writeln!(file, "{}", "-".repeat(80))?;
    writeln!(file)?;

    for section in &document.content.sections {
        if !section.heading.is_empty() {
            writeln!(file, "{}", section.heading)?;
        }
        writeln!(file, "{}", section.body)?;
        writeln!(file)?;
    }

    if !document.content.code_blocks.is_empty() {
        writeln!(file, "Code Examples:")?;
        for code in &document.content.code_blocks {
            writeln!(file)?;
            writeln!(file, "Language: {}", code.language)?;
            writeln!(file, "{}", code.code)?;
        }
    }

    Ok(())
}
