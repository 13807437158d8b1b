//! Local feature-hashing embeddings, deterministic and offline

use async_trait::async_trait;

use crate::data::CoreError;
use crate::traits::EmbeddingGenerator;

pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Local embedding generator based on signed feature hashing of words and word pairs.
///
/// Deterministic across runs and platforms, needs no network, and places texts that
/// share vocabulary close together under cosine similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingGenerator {
    embedding_dimension: usize,
}

impl HashingEmbeddingGenerator {
    pub fn new(embedding_dimension: usize) -> Self {
        Self { embedding_dimension }
    }

    pub fn with_default_dimension() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }

    fn add_feature(&self, embedding: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let index = (hash % self.embedding_dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[index] += sign * weight;
    }
}

/// 64-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl EmbeddingGenerator for HashingEmbeddingGenerator {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        if self.embedding_dimension == 0 {
            return Err(CoreError::ConfigError("embedding dimension must be positive".into()));
        }

        let tokens = words(text);
        if tokens.is_empty() {
            return Err(CoreError::ValidationError("no words to embed".into()));
        }

        let mut embedding = vec![0.0; self.embedding_dimension];
        for word in &tokens {
            self.add_feature(&mut embedding, word, 1.0);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut embedding, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        // Normalize the embedding to unit length for cosine similarity
        let magnitude = embedding.iter().map(|&v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_id(&self) -> String {
        format!("hashing-{}", self.embedding_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn test_vectors_are_deterministic_and_normalized() {
        let generator = HashingEmbeddingGenerator::with_default_dimension();
        let a = generator.generate_embedding("Creamy tomato soup").await.unwrap();
        let b = generator.generate_embedding("creamy TOMATO soup!").await.unwrap();

        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let generator = HashingEmbeddingGenerator::new(256);
        let query = generator.generate_embedding("spicy chicken curry").await.unwrap();
        let close = generator
            .generate_embedding("chicken curry with coconut milk, spicy")
            .await
            .unwrap();
        let far = generator
            .generate_embedding("vanilla sponge cake with buttercream")
            .await
            .unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let generator = HashingEmbeddingGenerator::new(8);
        assert!(generator.generate_embedding("  ... ").await.is_err());
        assert_eq!(generator.model_id(), "hashing-8");
    }
}
