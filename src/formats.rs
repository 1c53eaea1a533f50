use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One logical slice of a documentation page: a heading plus everything
/// up to the next heading, with any per-platform instruction tabs that
/// appeared inside that span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
    /// Keyed by lowercased tab name; empty when the section has no tabs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform_variants: BTreeMap<String, PlatformInstructions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInstructions {
    pub steps: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
    pub context: String,
    pub filename: String,
}

impl CodeBlock {
    pub const UNKNOWN_LANGUAGE: &'static str = "unknown";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub title: String,
    pub sections: Vec<Section>,
    pub code_blocks: Vec<CodeBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    pub url: String,
    pub version: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub crawl_timestamp: String,
    pub reading_time_minutes: u32,
    pub content_length: usize,
    pub code_block_count: usize,
}

/// The stored record. `source.url` is the natural key: a store must
/// refuse a second insert for a URL it already holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub subdomain: String,
    pub source: DocumentSource,
    pub content: NormalizedDocument,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub processed_for_embeddings: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Title,
    Heading,
    Content,
    Code,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Heading => "heading",
            Self::Content => "content",
            Self::Code => "code",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub subdomain: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Unit of text handed to the embedding stage; distinct from a Section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub kind: ChunkKind,
    pub metadata: ChunkMetadata,
}
