//! Cosine-similarity top-k retrieval over the vector store.

use tracing::warn;

use crate::vector_store::VectorStore;

/// Fragments returned per question when no override is configured.
pub const DEFAULT_TOP_K: usize = 3;

/// Cosine similarity of two vectors.
///
/// Returns `0.0` when either vector has zero magnitude, the lengths differ or a
/// component is not finite, so degenerate entries sink to the bottom of the
/// ranking instead of failing.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    let similarity = dot / denom;
    if denom == 0.0 || !similarity.is_finite() {
        0.0
    } else {
        similarity as f32
    }
}

/// Retrieval hit with its position in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFragment {
    /// Index of the entry in the store.
    pub index: usize,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Fragment text.
    pub text: String,
}

/// Ranks stored fragments against a query vector.
#[derive(Debug, Clone, Copy)]
pub struct Retriever<'a> {
    store: &'a VectorStore,
}

impl<'a> Retriever<'a> {
    /// Retriever over `store`.
    pub fn new(store: &'a VectorStore) -> Self {
        Self { store }
    }

    /// Texts of the `k` most similar fragments, most similar first.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Vec<String> {
        self.retrieve_scored(query, k)
            .into_iter()
            .map(|hit| hit.text)
            .collect()
    }

    /// Like [`Retriever::retrieve`] but keeps the score and store index.
    ///
    /// Returns `min(k, store.len())` hits. Ties keep store order.
    pub fn retrieve_scored(&self, query: &[f32], k: usize) -> Vec<ScoredFragment> {
        if k == 0 || self.store.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .store
            .all()
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                if entry.embedding.len() != query.len() {
                    warn!(
                        entry = idx,
                        stored = entry.embedding.len(),
                        query = query.len(),
                        "embedding dimension mismatch; scoring as 0"
                    );
                }
                (idx, cosine_similarity(query, &entry.embedding))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        let entries = self.store.all();
        scored
            .into_iter()
            .map(|(index, score)| ScoredFragment {
                index,
                score,
                text: entries[index].fragment.text.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Fragment;
    use crate::vector_store::StoreEntry;

    fn store(vectors: &[(&str, Vec<f32>)]) -> VectorStore {
        VectorStore::from_entries(
            vectors
                .iter()
                .enumerate()
                .map(|(index, (text, embedding))| StoreEntry {
                    fragment: Fragment {
                        index,
                        char_start: 0,
                        char_end: text.chars().count(),
                        text: text.to_string(),
                    },
                    embedding: embedding.clone(),
                })
                .collect(),
        )
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn self_similarity_is_one() {
        for v in [vec![1.0, 0.0], vec![0.3, -2.0, 7.5], vec![1e-3, 1e3]] {
            assert!(approx(cosine_similarity(&v, &v), 1.0), "{v:?}");
        }
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = [0.2, 0.9, -0.4];
        let b = [1.5, -0.1, 0.3];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn zero_magnitude_and_mismatched_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn top_two_of_three_known_vectors() {
        let store = store(&[
            ("east", vec![1.0, 0.0]),
            ("north", vec![0.0, 1.0]),
            ("diagonal", vec![1.0, 1.0]),
        ]);
        let hits = Retriever::new(&store).retrieve_scored(&[1.0, 0.1], 2);
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "diagonal"]);
        assert!(approx(hits[0].score, 0.995), "{}", hits[0].score);
        assert!(approx(hits[1].score, 0.774), "{}", hits[1].score);
        assert!(approx(cosine_similarity(&[1.0, 0.1], &[0.0, 1.0]), 0.0995));
    }

    #[test]
    fn returns_min_of_k_and_len_in_non_increasing_order() {
        let store = store(&[
            ("a", vec![0.1, 0.9]),
            ("b", vec![0.9, 0.1]),
            ("c", vec![0.5, 0.5]),
            ("d", vec![-1.0, 0.2]),
        ]);
        let retriever = Retriever::new(&store);
        for k in 0..7 {
            let hits = retriever.retrieve_scored(&[1.0, 0.3], k);
            assert_eq!(hits.len(), k.min(store.len()));
            assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        }
        assert_eq!(retriever.retrieve(&[1.0, 0.3], DEFAULT_TOP_K), vec!["b", "c", "a"]);
    }

    #[test]
    fn non_finite_components_score_zero() {
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::INFINITY, 0.0], &[1.0, 0.0]), 0.0);

        let store = store(&[
            ("nan", vec![f32::NAN, 1.0]),
            ("east", vec![1.0, 0.0]),
            ("overflow", vec![f32::INFINITY, f32::NEG_INFINITY]),
            ("north", vec![0.0, 1.0]),
        ]);
        let hits = Retriever::new(&store).retrieve_scored(&[1.0, 0.1], 4);
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "north", "nan", "overflow"]);
        assert!(hits.iter().all(|h| h.score.is_finite()));
    }

    #[test]
    fn empty_store_returns_nothing() {
        let store = VectorStore::default();
        assert!(Retriever::new(&store).retrieve(&[1.0], 3).is_empty());
    }
}
