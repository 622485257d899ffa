//! Text-to-vector embedding boundary, shared by the synergy engine's device
//! description embeddings (§4.4), the resolver's semantic signal (§4.7), and
//! the retrieval cache's query embeddings (§4.9). Grounded on the teacher's
//! `memory-core/src/embeddings/provider.rs` `EmbeddingProvider` trait.

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Default batches sequentially; a provider backed by a batch API can override.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(embeddings)
    }

    fn embedding_dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}
