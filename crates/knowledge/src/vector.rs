//! Vector similarity search over embedded chunks.

/// A chunk of the narrative with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A chunk selected for a query, with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank chunks by similarity to `query`, best first.
///
/// Keeps at most `limit` chunks scoring at least `min_score`. Ties keep
/// document order.
pub fn top_k(chunks: &[IndexedChunk], query: &[f32], limit: usize, min_score: f32) -> Vec<ScoredChunk> {
    let mut scored: Vec<(usize, f32)> = chunks
        .iter()
        .enumerate()
        .filter_map(|(i, chunk)| {
            let sim = cosine_similarity(&chunk.embedding, query);
            (sim >= min_score).then_some((i, sim))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(i, score)| ScoredChunk {
            text: chunks[i].text.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            text: text.into(),
            embedding,
        }
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn top_k_orders_and_limits() {
        let chunks = vec![
            chunk("pricing", vec![0.0, 1.0]),
            chunk("emi", vec![1.0, 0.0]),
            chunk("kyc", vec![0.7, 0.7]),
        ];
        let hits = top_k(&chunks, &[1.0, 0.0], 2, -1.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "emi");
        assert_eq!(hits[1].text, "kyc");
    }

    #[test]
    fn top_k_applies_min_score() {
        let chunks = vec![chunk("pricing", vec![0.0, 1.0]), chunk("emi", vec![1.0, 0.0])];
        let hits = top_k(&chunks, &[1.0, 0.0], 4, 0.5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "emi");
    }
}
