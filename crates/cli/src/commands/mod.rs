//! Subcommands and the setup they share.

pub mod doctor;
pub mod query;
pub mod run;

use std::path::Path;
use std::sync::Arc;
use ragcall_config::AppConfig;
use ragcall_core::event::EventBus;
use ragcall_core::persona::AgentPersona;
use ragcall_core::error::KnowledgeError;
use ragcall_core::provider::Provider;
use ragcall_knowledge::source::preflight;
use ragcall_knowledge::{RetrievalService, SourcePolicy, VectorIndexBuilder};
use tracing::warn;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Missing credentials are only a warning; retrieval and replies fail later.
pub fn warn_missing_credentials(config: &AppConfig) {
    if !config.has_api_key() {
        warn!(
            "No API key found (GOOGLE_API_KEY, GOOGLE_APPLICATION_CREDENTIALS, RAGCALL_API_KEY or \
             OPENAI_API_KEY). Knowledge base and replies may fail."
        );
    }
}

/// Warn early when the narrative file cannot back the knowledge base.
pub fn check_narrative(config: &AppConfig) -> Result<(), KnowledgeError> {
    let path = config.knowledge.source_path();
    let result = preflight(&path, &SourcePolicy::from_config(&config.knowledge)).map(|_| ());
    if let Err(e) = &result {
        warn!(
            path = %path.display(),
            reason = %e,
            "The agent may not function as intended without the correct {}",
            config.persona.profile.knowledge_label
        );
    }
    result
}

pub fn build_persona(config: &AppConfig) -> AgentPersona {
    AgentPersona::load(
        config.persona.profile.clone(),
        config.persona.instructions_file.as_deref(),
    )
}

pub fn build_service(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    event_bus: Arc<EventBus>,
) -> RetrievalService {
    let builder = VectorIndexBuilder::new(
        provider,
        &config.knowledge,
        config.text_model(),
        config.default_temperature,
    );
    RetrievalService::new(&config.knowledge, Arc::new(builder))
        .with_profile(config.persona.profile.clone())
        .with_event_bus(event_bus)
}
