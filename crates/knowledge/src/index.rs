//! Vector index over the narrative.
//!
//! Built once from a validated source; read-only afterwards and shared
//! behind an `Arc`. A query embeds the text, picks the top-k chunks and
//! turns them into one answer according to the [`ResponseMode`].

use std::sync::Arc;
use async_trait::async_trait;
use ragcall_config::{KnowledgeConfig, ResponseMode};
use ragcall_core::error::{KnowledgeError, RetrievalError};
use ragcall_core::message::Message;
use ragcall_core::provider::{EmbeddingRequest, Provider, ProviderRequest};
use ragcall_core::retrieval::{EMPTY_RESPONSE, RetrievalIndex};
use tracing::{debug, info};

use crate::chunker::chunk_text;
use crate::vector::{IndexedChunk, ScoredChunk, top_k};

/// Chunks per embedding request.
const EMBED_BATCH: usize = 64;

/// Settings applied at query time.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub embedding_model: String,
    /// Model used for refine synthesis
    pub completion_model: String,
    pub temperature: f32,
    pub similarity_top_k: usize,
    pub min_similarity: f32,
    pub response_mode: ResponseMode,
}

impl QuerySettings {
    pub fn from_config(
        config: &KnowledgeConfig,
        completion_model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            embedding_model: config.embedding_model.clone(),
            completion_model: completion_model.into(),
            temperature,
            similarity_top_k: config.similarity_top_k,
            min_similarity: config.min_similarity,
            response_mode: config.response_mode,
        }
    }
}

pub struct VectorIndex {
    chunks: Vec<IndexedChunk>,
    provider: Arc<dyn Provider>,
    settings: QuerySettings,
}

impl VectorIndex {
    /// Create an index from already-embedded chunks.
    pub fn new(chunks: Vec<IndexedChunk>, provider: Arc<dyn Provider>, settings: QuerySettings) -> Self {
        Self {
            chunks,
            provider,
            settings,
        }
    }

    /// Chunk and embed `text`, then build the index.
    pub async fn from_text(
        text: &str,
        chunk_size: usize,
        chunk_overlap: usize,
        provider: Arc<dyn Provider>,
        settings: QuerySettings,
    ) -> Result<Self, KnowledgeError> {
        let texts = chunk_text(text, chunk_size, chunk_overlap);
        if texts.is_empty() {
            return Err(KnowledgeError::IndexBuild("source has no text to index".into()));
        }

        let mut chunks = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH) {
            let response = provider
                .embed(EmbeddingRequest {
                    model: settings.embedding_model.clone(),
                    inputs: batch.to_vec(),
                })
                .await
                .map_err(|e| KnowledgeError::IndexBuild(format!("embedding failed: {e}")))?;

            if response.embeddings.len() != batch.len() {
                return Err(KnowledgeError::IndexBuild(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            chunks.extend(
                batch
                    .iter()
                    .zip(response.embeddings)
                    .map(|(text, embedding)| IndexedChunk {
                        text: text.clone(),
                        embedding,
                    }),
            );
        }

        info!(
            chunks = chunks.len(),
            model = %settings.embedding_model,
            "Vector index built"
        );

        Ok(Self::new(chunks, provider, settings))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-k chunks for `text`, best first.
    pub async fn retrieve(&self, text: &str) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.settings.embedding_model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        let query = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("no embedding returned".into()))?;

        Ok(top_k(
            &self.chunks,
            &query,
            self.settings.similarity_top_k,
            self.settings.min_similarity,
        ))
    }

    async fn refine(&self, query: &str, hits: &[ScoredChunk]) -> Result<String, RetrievalError> {
        let mut answer = String::new();

        for hit in hits {
            let prompt = if answer.is_empty() {
                qa_prompt(query, &hit.text)
            } else {
                refine_prompt(query, &answer, &hit.text)
            };

            let mut request = ProviderRequest::new(
                self.settings.completion_model.clone(),
                vec![Message::user(prompt)],
            );
            request.temperature = self.settings.temperature;

            let response = self.provider.complete(request).await?;
            let text = response.message.content.trim();
            if !text.is_empty() {
                answer = text.to_string();
            }
        }

        Ok(answer)
    }
}

#[async_trait]
impl RetrievalIndex for VectorIndex {
    async fn query(&self, text: &str) -> Result<String, RetrievalError> {
        let hits = self.retrieve(text).await?;
        debug!(hits = hits.len(), "Retrieved chunks");

        if hits.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let answer = match self.settings.response_mode {
            ResponseMode::Compact => hits
                .iter()
                .map(|h| h.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            ResponseMode::Refine => self.refine(text, &hits).await?,
        };

        if answer.trim().is_empty() {
            Ok(EMPTY_RESPONSE.to_string())
        } else {
            Ok(answer)
        }
    }
}

fn qa_prompt(query: &str, context: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}

fn refine_prompt(query: &str, existing: &str, context: &str) -> String {
    format!(
        "The original query is as follows: {query}\n\
         We have provided an existing answer: {existing}\n\
         We have the opportunity to refine the existing answer (only if needed) with some more context below.\n\
         ------------\n\
         {context}\n\
         ------------\n\
         Given the new context, refine the original answer to better answer the query. \
         If the context isn't useful, return the original answer.\n\
         Refined Answer: "
    )
}
