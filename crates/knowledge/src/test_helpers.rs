//! Test doubles shared by the knowledge tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use async_trait::async_trait;
use ragcall_core::error::{KnowledgeError, ProviderError, RetrievalError};
use ragcall_core::message::Message;
use ragcall_core::provider::*;
use ragcall_core::retrieval::RetrievalIndex;

use crate::service::IndexBuilder;
use crate::source::KnowledgeSource;

const KEYWORDS: [&str; 5] = ["emi", "nbfc", "kyc", "pricing", "fee"];

/// Embeds text as a keyword-presence vector; answers completions with
/// "draft:" or "refined:" depending on the prompt.
pub struct KeywordProvider {
    fail_embeddings: AtomicBool,
    embedded: AtomicUsize,
    completions: AtomicUsize,
}

impl KeywordProvider {
    pub fn new() -> Self {
        Self {
            fail_embeddings: AtomicBool::new(false),
            embedded: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
        }
    }

    pub fn failing_embeddings() -> Self {
        let provider = Self::new();
        provider.fail_embeddings_from_now();
        provider
    }

    pub fn fail_embeddings_from_now(&self) {
        self.fail_embeddings.store(true, Ordering::SeqCst);
    }

    pub fn embedded_texts(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    pub fn completion_calls(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    fn embed_one(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect()
    }
}

#[async_trait]
impl Provider for KeywordProvider {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.completions.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let text = if prompt.starts_with("The original query") {
            format!("refined: answer {n}")
        } else {
            format!("draft: answer {n}")
        };
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: request.model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        if self.fail_embeddings.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("embedding endpoint unreachable".into()));
        }
        self.embedded.fetch_add(request.inputs.len(), Ordering::SeqCst);
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| Self::embed_one(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Index that answers every query with a fixed text.
pub struct FixedIndex(pub String);

#[async_trait]
impl RetrievalIndex for FixedIndex {
    async fn query(&self, _text: &str) -> Result<String, RetrievalError> {
        Ok(self.0.clone())
    }
}

/// Builder that counts builds and can be told to fail.
pub struct CountingBuilder {
    builds: AtomicUsize,
    fail: AtomicBool,
}

impl CountingBuilder {
    pub fn new() -> Self {
        Self {
            builds: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let builder = Self::new();
        builder.fail.store(true, Ordering::SeqCst);
        builder
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexBuilder for CountingBuilder {
    async fn build(&self, source: &KnowledgeSource) -> Result<Arc<dyn RetrievalIndex>, KnowledgeError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(KnowledgeError::IndexBuild("embedding quota exhausted".into()));
        }
        Ok(Arc::new(FixedIndex(format!("{} bytes indexed", source.size_bytes))))
    }
}
