use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher as _};

/// Vector width of the embedding space. Matches the sentence-transformer
/// the hosted pipeline uses, so indexes stay compatible.
pub const EMBEDDING_DIM: usize = 384;

/// Turns chunk texts into fixed-width vectors. The hosted embedding model
/// is an external collaborator behind this seam.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Deterministic offline embedder: hashes lowercased tokens into a
/// fixed-width bag-of-words vector and L2-normalizes it. Not a semantic
/// model, but it preserves cosine ordering for overlapping vocabulary,
/// which is enough for the pipeline and its tests.
#[derive(Debug, Clone, Default)]
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn new() -> Self {
        Self
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| embed_one(text)).collect())
    }
}

fn embed_one(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.to_lowercase().hash(&mut hasher);
        let slot = (hasher.finish() % EMBEDDING_DIM as u64) as usize;
        vector[slot] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}
