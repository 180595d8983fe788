//! Embedding (de)serialization and in-process nearest-neighbor ranking.
//!
//! `rusqlite`'s bundled SQLite build has no loadable-extension support, so
//! embeddings are stored as plain `BLOB` columns (packed little-endian f32)
//! rather than in a `vec0` virtual table, and nearest-neighbor search is a
//! linear scan performed in Rust.

/// Pack a float vector as little-endian bytes for storage in a BLOB column.
pub fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for v in embedding {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Unpack a BLOB column back into a float vector.
pub fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine distance (`1 - cosine_similarity`), lower is more similar.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..len {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Rank `(id, embedding)` candidates against `query` by ascending cosine
/// distance, breaking ties by ascending id (deterministic row order), and
/// return the top `limit`.
pub fn top_k_by_distance<T: Clone>(
    candidates: Vec<(i64, Vec<f32>, T)>,
    query: &[f32],
    limit: usize,
) -> Vec<(T, f32)> {
    let mut scored: Vec<(i64, f32, T)> = candidates
        .into_iter()
        .map(|(id, emb, payload)| (id, cosine_distance(query, &emb), payload))
        .collect();
    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored
        .into_iter()
        .take(limit)
        .map(|(_, dist, payload)| (payload, dist))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_embedding() {
        let v = vec![1.0f32, -2.5, 3.25, 0.0];
        let bytes = serialize_embedding(&v);
        assert_eq!(bytes.len(), 16);
        let back = deserialize_embedding(&bytes);
        assert_eq!(back, v);
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!(cosine_distance(&v, &v) < 1e-6);
    }

    #[test]
    fn top_k_orders_by_distance_then_id() {
        let query = vec![1.0f32, 0.0];
        let candidates = vec![
            (2i64, vec![0.0f32, 1.0], "b"),
            (1i64, vec![1.0f32, 0.0], "a"),
            (3i64, vec![1.0f32, 0.0], "c"),
        ];
        let ranked = top_k_by_distance(candidates, &query, 2);
        assert_eq!(ranked[0].0, "a");
        assert_eq!(ranked[1].0, "c");
    }
}
