// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text embeddings and similarity.
//!
//! [`HashingEmbedder`] uses the feature-hashing trick: every lowercase word
//! and word bigram is hashed with SHA-256 into one of `dimensions` buckets
//! with a hash-derived sign. The result is deterministic across processes,
//! so migrated data embeds identically on every machine.

use sha2::{Digest, Sha256};

/// Produces fixed-width, L2-normalized vectors for text.
pub trait Embedder: Send + Sync + 'static {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// `dimensions` is clamped to at least 1.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut index = [0u8; 8];
        index.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(index) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

/// Lowercase alphanumeric words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        let words = tokenize(text);
        for word in &words {
            let (i, sign) = self.bucket(word);
            vec[i] += sign;
        }
        for pair in words.windows(2) {
            let (i, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vec[i] += 0.5 * sign;
        }
        l2_normalize(&vec)
    }
}

/// L2-normalize a vector. Zero vectors are returned unchanged.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

/// Cosine similarity of two L2-normalized vectors (their dot product).
///
/// Vectors of different widths are unrelated and score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("Django's ORM, v5.0!"), ["django", "s", "orm", "v5", "0"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn embeddings_are_deterministic_and_normalized() {
        let e = HashingEmbedder::new(64);
        let a = e.embed("Django models and migrations");
        let b = e.embed("Django models and migrations");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_scores_higher() {
        let e = HashingEmbedder::new(256);
        let query = e.embed("django migrations");
        let close = e.embed("Running Django migrations safely");
        let far = e.embed("Rotate signing keys for tokens");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
        assert!((cosine_similarity(&close, &close) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero() {
        let e = HashingEmbedder::new(8);
        let v = e.embed("");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &e.embed("anything")), 0.0);
    }

    #[test]
    fn width_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
