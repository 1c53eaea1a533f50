use anyhow::Context as _;

use crate::chunk::prepare_chunks;
use crate::cli::{EmbedArgs, SearchArgs};
use crate::embed::{Embedder, HashingEmbedder, EMBEDDING_DIM};
use crate::store::DocumentStore;
use crate::vector::{VectorIndex, VectorPayload, VectorPoint};

pub async fn run(args: EmbedArgs) -> anyhow::Result<()> {
    let mut store = crate::store::JsonlStore::open(&args.store)
        .with_context(|| format!("open document store: {}", args.store))?;
    let mut index = VectorIndex::open(&args.vectors, EMBEDDING_DIM)
        .with_context(|| format!("open vector index: {}", args.vectors))?;
    let embedder = HashingEmbedder::new();

    let processed = process_documents(&mut store, &embedder, &mut index)?;
    tracing::info!(processed, vectors = index.len(), "feature pipeline finished");
    Ok(())
}

/// Chunks every unprocessed document, embeds the chunk texts, upserts the
/// vectors, and marks the document processed. Returns how many documents
/// were processed.
pub fn process_documents(
    store: &mut dyn DocumentStore,
    embedder: &dyn Embedder,
    index: &mut VectorIndex,
) -> anyhow::Result<usize> {
    let documents = store.unprocessed();
    tracing::info!(count = documents.len(), "documents to process");

    let mut processed = 0;
    for document in documents {
        let chunks = prepare_chunks(&document);
        if chunks.is_empty() {
            tracing::warn!(id = %document.id, url = %document.source.url, "document produced no chunks");
        } else {
            let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = embedder
                .embed(&texts)
                .with_context(|| format!("embed chunks for document {}", document.id))?;

            let base_id = index.next_id();
            let points: Vec<VectorPoint> = chunks
                .into_iter()
                .zip(embeddings)
                .enumerate()
                .map(|(offset, (chunk, vector))| VectorPoint {
                    id: base_id + offset as u64,
                    vector,
                    payload: VectorPayload {
                        text: chunk.text,
                        kind: chunk.kind,
                        metadata: chunk.metadata,
                    },
                })
                .collect();
            index.upsert(points).context("upsert vectors")?;
        }

        store.mark_processed(&document.id)?;
        processed += 1;
    }

    Ok(processed)
}

/// Embeds the query text and prints the closest stored chunks. Retrieval
/// only; answering with a language model is out of scope here.
pub async fn search(args: SearchArgs) -> anyhow::Result<()> {
    let index = VectorIndex::open(&args.vectors, EMBEDDING_DIM)
        .with_context(|| format!("open vector index: {}", args.vectors))?;
    let embedder = HashingEmbedder::new();

    let query = embedder
        .embed(std::slice::from_ref(&args.query))
        .context("embed query")?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))?;

    let hits = index.search(&query, args.limit).context("search index")?;
    for hit in hits {
        println!(
            "{:.4}\t{}\t{}\n\t{}",
            hit.score,
            hit.point.payload.metadata.url,
            hit.point.payload.kind.as_str(),
            hit.point.payload.text.replace('\n', "\n\t")
        );
    }
    Ok(())
}
