//! Retrieval service — owns the process's single knowledge index.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──▶ Ready        (index built, cached)
//!               └─────────────────▶ Unavailable  (missing, invalid, or build failed)
//! ```
//!
//! `initialize()` on a `Ready` service returns the cached index without
//! rebuilding. On an `Unavailable` service it tries again, so a narrative
//! fixed on disk is picked up by the next initialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use ragcall_config::KnowledgeConfig;
use ragcall_core::error::KnowledgeError;
use ragcall_core::event::{DomainEvent, EventBus};
use ragcall_core::persona::PersonaProfile;
use ragcall_core::provider::Provider;
use ragcall_core::retrieval::RetrievalIndex;
use tracing::{debug, error, info, warn};

use crate::index::{QuerySettings, VectorIndex};
use crate::source::{KnowledgeSource, SourcePolicy, write_placeholder};

/// Turns a validated source into a queryable index.
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(&self, source: &KnowledgeSource) -> Result<Arc<dyn RetrievalIndex>, KnowledgeError>;
}

/// Builds a [`VectorIndex`] with embeddings from a [`Provider`].
pub struct VectorIndexBuilder {
    provider: Arc<dyn Provider>,
    chunk_size: usize,
    chunk_overlap: usize,
    settings: QuerySettings,
}

impl VectorIndexBuilder {
    pub fn new(
        provider: Arc<dyn Provider>,
        config: &KnowledgeConfig,
        completion_model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            settings: QuerySettings::from_config(config, completion_model, temperature),
        }
    }
}

#[async_trait]
impl IndexBuilder for VectorIndexBuilder {
    async fn build(&self, source: &KnowledgeSource) -> Result<Arc<dyn RetrievalIndex>, KnowledgeError> {
        let index = VectorIndex::from_text(
            &source.content,
            self.chunk_size,
            self.chunk_overlap,
            self.provider.clone(),
            self.settings.clone(),
        )
        .await?;
        Ok(Arc::new(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Ready,
    Unavailable,
}

pub struct RetrievalService {
    source_path: PathBuf,
    policy: SourcePolicy,
    profile: PersonaProfile,
    builder: Arc<dyn IndexBuilder>,
    index: Option<Arc<dyn RetrievalIndex>>,
    state: ServiceState,
    event_bus: Option<Arc<EventBus>>,
}

impl RetrievalService {
    pub fn new(config: &KnowledgeConfig, builder: Arc<dyn IndexBuilder>) -> Self {
        Self {
            source_path: config.source_path(),
            policy: SourcePolicy::from_config(config),
            profile: PersonaProfile::default(),
            builder,
            index: None,
            state: ServiceState::Uninitialized,
            event_bus: None,
        }
    }

    /// Persona fields used when a placeholder narrative has to be written.
    pub fn with_profile(mut self, profile: PersonaProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Load the source and build the index.
    ///
    /// Returns the index, or `None` when the knowledge base is unavailable.
    /// Never fails: every problem is logged and leaves the service without
    /// an index.
    pub async fn initialize(&mut self) -> Option<Arc<dyn RetrievalIndex>> {
        if self.state == ServiceState::Ready {
            debug!(path = %self.source_path.display(), "Knowledge base already initialized");
            return self.index.clone();
        }

        info!(path = %self.source_path.display(), "Initializing knowledge base");

        self.index = match self.load().await {
            Ok(index) => {
                info!(path = %self.source_path.display(), "Knowledge base initialized successfully");
                Some(index)
            }
            Err(KnowledgeError::Missing(path)) => {
                match write_placeholder(&path, &self.profile) {
                    Ok(()) => warn!(
                        path = %path.display(),
                        "Knowledge source missing; placeholder created. Replace it with the real {}",
                        self.profile.knowledge_label
                    ),
                    Err(e) => error!(error = %e, "Knowledge source missing and placeholder could not be written"),
                }
                None
            }
            Err(e @ (KnowledgeError::TooSmall { .. } | KnowledgeError::Placeholder(_))) => {
                warn!(
                    reason = %e,
                    "Knowledge source is not usable; the agent will lack narrative knowledge"
                );
                None
            }
            Err(e) => {
                error!(error = %e, "Error initializing knowledge base");
                None
            }
        };

        self.state = if self.index.is_some() {
            ServiceState::Ready
        } else {
            ServiceState::Unavailable
        };

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::KnowledgeBaseInitialized {
                available: self.index.is_some(),
                source: self.source_path.display().to_string(),
                timestamp: Utc::now(),
            });
        }

        self.index.clone()
    }

    async fn load(&self) -> Result<Arc<dyn RetrievalIndex>, KnowledgeError> {
        let source = KnowledgeSource::read(&self.source_path)?;
        self.policy.validate(&source)?;
        self.builder.build(&source).await
    }

    /// The built index, if any.
    pub fn index(&self) -> Option<Arc<dyn RetrievalIndex>> {
        self.index.clone()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}
