use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::PathBuf;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::formats::{ChunkKind, ChunkMetadata};

/// One stored vector: sequential id, embedding, and the chunk payload
/// retrieval needs to reconstruct an answer context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: VectorPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPayload {
    pub text: String,
    pub kind: ChunkKind,
    #[serde(flatten)]
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub score: f32,
    pub point: VectorPoint,
}

/// Single-collection cosine-similarity index: upsert-only, sequential
/// integer ids, JSONL-persisted, linear-scan search. Index internals
/// beyond this narrow client are someone else's problem.
#[derive(Debug)]
pub struct VectorIndex {
    path: PathBuf,
    dim: usize,
    points: Vec<VectorPoint>,
}

impl VectorIndex {
    pub fn open(path: impl Into<PathBuf>, dim: usize) -> anyhow::Result<Self> {
        let path = path.into();
        let mut points = Vec::new();

        match OpenOptions::new().read(true).open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line =
                        line.with_context(|| format!("read vector line: {}", path.display()))?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let point: VectorPoint = serde_json::from_str(&line)
                        .with_context(|| format!("parse vector record: {}", path.display()))?;
                    if point.vector.len() != dim {
                        anyhow::bail!(
                            "vector width mismatch in {}: expected {dim}, found {}",
                            path.display(),
                            point.vector.len()
                        );
                    }
                    points.push(point);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("open vector index: {}", path.display()));
            }
        }

        Ok(Self { path, dim, points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.points.last().map(|point| point.id + 1).unwrap_or(0)
    }

    /// Appends points to the collection. Ids are expected to continue the
    /// sequence from `next_id`; widths must match the collection's.
    pub fn upsert(&mut self, points: Vec<VectorPoint>) -> anyhow::Result<()> {
        for point in &points {
            if point.vector.len() != self.dim {
                anyhow::bail!(
                    "vector width mismatch: expected {}, got {}",
                    self.dim,
                    point.vector.len()
                );
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create vector index dir: {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open vector index: {}", self.path.display()))?;
        for point in &points {
            serde_json::to_writer(&mut file, point).context("serialize vector record")?;
            file.write_all(b"\n").context("write vector newline")?;
        }
        file.flush().context("flush vector index")?;

        self.points.extend(points);
        Ok(())
    }

    /// Top-`limit` points by cosine similarity to `query`.
    pub fn search(&self, query: &[f32], limit: usize) -> anyhow::Result<Vec<ScoredPoint>> {
        if query.len() != self.dim {
            anyhow::bail!(
                "query width mismatch: expected {}, got {}",
                self.dim,
                query.len()
            );
        }

        let mut scored: Vec<ScoredPoint> = self
            .points
            .iter()
            .map(|point| ScoredPoint {
                score: cosine_similarity(query, &point.vector),
                point: point.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
