//! Deterministic, network-free embedder for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};

use super::Embedder;

/// Returns registered vectors for known texts and a hashed character histogram otherwise.
#[derive(Debug)]
pub struct FakeEmbedder {
    dimensions: usize,
    known: HashMap<String, Vec<f32>>,
    fail_first: usize,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    /// Fake producing `dimensions`-length vectors for unknown texts.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            known: HashMap::new(),
            fail_first: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Pins the vector returned for `text`.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.known.insert(text.into(), vector);
        self
    }

    /// Makes the first `n` calls fail.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Calls observed so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for ch in text.chars().flat_map(char::to_lowercase) {
            if ch.is_alphanumeric() {
                vector[ch as usize % self.dimensions] += 1.0;
            }
        }
        vector
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            bail!("injected failure on attempt {call}");
        }
        Ok(self
            .known
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.hashed(text)))
    }

    fn model(&self) -> &str {
        "fake-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_vectors_are_deterministic() {
        let fake = FakeEmbedder::new(16);
        let a = fake.embed("El gato negro").expect("embed");
        let b = fake.embed("el GATO negro").expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn default_fake_embeds_unknown_text() {
        let fake = FakeEmbedder::default();
        assert_eq!(fake.embed("hola").expect("embed"), vec![4.0]);
        assert_eq!(FakeEmbedder::new(0).embed("").expect("embed"), vec![0.0]);
    }

    #[test]
    fn registered_vectors_win() {
        let fake = FakeEmbedder::new(2).with_vector("x", vec![1.0, 0.0]);
        assert_eq!(fake.embed("x").expect("embed"), vec![1.0, 0.0]);
    }
}
