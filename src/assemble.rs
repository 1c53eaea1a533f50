use url::Url;

use crate::formats::{DocumentMetadata, DocumentSource, NormalizedDocument, PersistedDocument};

pub const DOC_TYPE_DOCUMENTATION: &str = "documentation";

/// Words-per-minute assumed when estimating reading time.
const READING_WPM: f64 = 200.0;

/// Wraps a normalized document into the persisted record shape: fresh id,
/// current timestamps, derived metadata. Pure data shaping.
pub fn assemble(
    document: NormalizedDocument,
    url: &Url,
    subdomain: &str,
    version: &str,
) -> PersistedDocument {
    let now = chrono::Utc::now().to_rfc3339();

    let word_count: usize = document
        .sections
        .iter()
        .map(|section| section.body.split_whitespace().count())
        .sum();
    let content_length: usize = document
        .sections
        .iter()
        .map(|section| section.body.len())
        .sum();
    let code_block_count = document.code_blocks.len();

    PersistedDocument {
        id: uuid::Uuid::new_v4().to_string(),
        doc_type: DOC_TYPE_DOCUMENTATION.to_owned(),
        subdomain: subdomain.to_owned(),
        source: DocumentSource {
            url: url.to_string(),
            version: version.to_owned(),
            last_updated: now.clone(),
        },
        content: document,
        metadata: DocumentMetadata {
            crawl_timestamp: now,
            reading_time_minutes: reading_time_minutes(word_count),
            content_length,
            code_block_count,
        },
        processed_for_embeddings: false,
    }
}

/// Estimated minutes to read `word_count` words; never 0.
pub fn reading_time_minutes(word_count: usize) -> u32 {
    ((word_count as f64 / READING_WPM).round() as u32).max(1)
}
