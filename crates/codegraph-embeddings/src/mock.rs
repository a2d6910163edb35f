//! Deterministic mock embeddings, grounded on
//! `DualEmbeddingService._generate_mock_embedding`: MD5-seeded, unit
//! normalized, no model download required.

use md5::{Digest, Md5};

const DIMENSION: usize = 768;

/// A small xorshift-style PRNG seeded from the text's MD5 digest, used only
/// to fan a single 128-bit hash out into 768 pseudo-random floats. Not a
/// cryptographic primitive — determinism is the only property that matters.
struct SeededRng(u64);

impl SeededRng {
    fn next_f32(&mut self) -> f32 {
        // xorshift64*
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        #[allow(clippy::cast_precision_loss)]
        let v = (self.0 >> 11) as f32 / (1u64 << 53) as f32;
        v
    }
}

/// Deterministic 768D vector seeded from `MD5(text)`, unit-normalized like
/// a real model's output.
#[must_use]
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let seed = u64::from_le_bytes(digest[0..8].try_into().expect("md5 digest is 16 bytes"));
    let mut rng = SeededRng(seed.max(1));

    let mut vector: Vec<f32> = (0..DIMENSION).map(|_| rng.next_f32()).collect();
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_input() {
        assert_eq!(mock_embedding("fn main() {}"), mock_embedding("fn main() {}"));
    }

    #[test]
    fn differs_for_different_input() {
        assert_ne!(mock_embedding("a"), mock_embedding("b"));
    }

    #[test]
    fn has_768_dimensions() {
        assert_eq!(mock_embedding("x").len(), 768);
    }

    #[test]
    fn is_unit_normalized() {
        let v = mock_embedding("hello world");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
