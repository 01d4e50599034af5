//! End-to-end integration tests for the ragcall call pipeline.
//!
//! These tests run a whole session: configuration, knowledge base loading,
//! the console transport, and per-turn gating and annotation.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use ragcall_agent::{SessionBootstrap, SessionState};
use ragcall_channels::ConsoleTransport;
use ragcall_config::AppConfig;
use ragcall_core::error::{ProviderError, TransportError};
use ragcall_core::event::{DomainEvent, EventBus};
use ragcall_core::message::{Conversation, Message, Role};
use ragcall_core::persona::AgentPersona;
use ragcall_core::provider::*;
use ragcall_core::retrieval::Classification;
use ragcall_knowledge::{RetrievalService, VectorIndexBuilder};

// ── Mock Provider ────────────────────────────────────────────────────────

const KEYWORDS: [&str; 4] = ["emi", "nbfc", "kyc", "fee"];

const NARRATIVE: &str = "Section 4: Pricing. The program fee can be paid in full or via No-Cost EMI.\n\
    Section 5: No-Cost EMI. NxtWave partners with NBFCs such as Varthana and Bajaj Finserv. \
    There is no interest and no collateral, and installments are small.\n\
    Section 6: KYC. The co-applicant shares PAN, Aadhaar, bank proof and a consent video.";

/// Keyword embeddings, a fixed grounded answer for synthesis prompts, and
/// a greeting for conversational replies.
struct ScriptedProvider {
    replies: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
        }
    }

    /// Message lists sent for conversational replies.
    fn reply_requests(&self) -> Vec<Vec<Message>> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let text = if prompt.starts_with("Context information") || prompt.starts_with("The original query") {
            "Varthana and Bajaj Finserv are partner NBFCs".to_string()
        } else {
            self.replies.lock().unwrap().push(request.messages.clone());
            "Namaste! Nenu Harshitha.".to_string()
        };
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let embeddings = request
            .inputs
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();
        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
            usage: None,
        })
    }
}

/// A provider without valid credentials: every completion is rejected, and
/// embeddings only work when `embeds` is set.
struct UnauthenticatedProvider {
    embeds: bool,
}

#[async_trait::async_trait]
impl Provider for UnauthenticatedProvider {
    fn name(&self) -> &str {
        "e2e_unauthenticated"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::AuthenticationFailed("no key".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        if !self.embeds {
            return Err(ProviderError::AuthenticationFailed("no key".into()));
        }
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|_| vec![1.0, 0.0]).collect(),
            model: request.model,
            usage: None,
        })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct CallOutcome {
    result: Result<(), TransportError>,
    conversation: Conversation,
    classifications: Vec<Classification>,
    knowledge_available: Option<bool>,
}

fn config_for(data_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.knowledge.data_dir = data_dir.to_path_buf();
    config
}

async fn run_call_with(config: &AppConfig, lines: &[&str], provider: Arc<dyn Provider>) -> CallOutcome {
    let event_bus = Arc::new(EventBus::default());
    let mut rx = event_bus.subscribe();

    let mut input = lines.join("\n");
    if !input.is_empty() {
        input.push('\n');
    }
    let transport = Arc::new(ConsoleTransport::with_io(
        provider.clone(),
        config.text_model(),
        Box::new(Cursor::new(input.into_bytes())),
        Box::new(tokio::io::sink()),
    ));

    let builder = VectorIndexBuilder::new(
        provider,
        &config.knowledge,
        config.text_model(),
        config.default_temperature,
    );
    let service = RetrievalService::new(&config.knowledge, Arc::new(builder))
        .with_profile(config.persona.profile.clone())
        .with_event_bus(event_bus.clone());

    let bootstrap = SessionBootstrap::new(
        service,
        transport.clone(),
        config.retrieval.clone(),
        config.session.clone(),
        event_bus,
    );
    let persona = Arc::new(AgentPersona::new(config.persona.profile.clone()));

    let result = bootstrap.run(persona).await;
    assert_eq!(bootstrap.state().await, SessionState::Ended);

    let mut classifications = Vec::new();
    let mut knowledge_available = None;
    while let Ok(event) = rx.try_recv() {
        match event.as_ref() {
            DomainEvent::TurnAnnotated { classification, .. } => classifications.push(*classification),
            DomainEvent::KnowledgeBaseInitialized { available, .. } => knowledge_available = Some(*available),
            _ => {}
        }
    }

    CallOutcome {
        result,
        conversation: transport.conversation().await.unwrap(),
        classifications,
        knowledge_available,
    }
}

async fn run_call(config: &AppConfig, lines: &[&str]) -> (CallOutcome, Arc<ScriptedProvider>) {
    let provider = Arc::new(ScriptedProvider::new());
    let outcome = run_call_with(config, lines, provider.clone()).await;
    assert!(outcome.result.is_ok());
    (outcome, provider)
}

fn system_notes(conversation: &Conversation) -> Vec<String> {
    conversation
        .messages()
        .iter()
        .skip(1) // persona instructions
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.clone())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn grounded_call_injects_narrative_content() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(tmp.path());
    std::fs::write(config.knowledge.source_path(), NARRATIVE).unwrap();

    let (outcome, provider) = run_call(&config, &["Which NBFC partners handle the EMI?", "ok", "exit"]).await;

    assert_eq!(outcome.knowledge_available, Some(true));
    assert_eq!(
        outcome.classifications,
        vec![Classification::Useful, Classification::Empty]
    );

    let notes = system_notes(&outcome.conversation);
    assert_eq!(notes.len(), 2);
    assert!(notes[0].starts_with("Relevant information from the NxtWave Onboarding Narrative"));
    assert!(notes[0].contains("'Varthana and Bajaj Finserv are partner NBFCs'"));
    assert!(notes[1].contains("Default Proactive Engagement"));

    // The reply to the first turn saw the user's message followed by the note
    let requests = provider.reply_requests();
    assert_eq!(requests.len(), 3); // opening + two turns
    let turn_one = &requests[1];
    let n = turn_one.len();
    assert_eq!(turn_one[n - 2].role, Role::User);
    assert_eq!(turn_one[n - 1].role, Role::System);
}

#[tokio::test]
async fn opening_reply_comes_before_any_user_turn() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(tmp.path());
    std::fs::write(config.knowledge.source_path(), NARRATIVE).unwrap();

    let (outcome, provider) = run_call(&config, &[]).await;

    let messages = outcome.conversation.messages();
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::Assistant);
    assert!(outcome.classifications.is_empty());

    let opening = &provider.reply_requests()[0];
    assert!(opening.last().unwrap().content.contains("begin the conversation"));
}

#[tokio::test]
async fn tiny_narrative_degrades_every_turn_to_unavailable() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(tmp.path());
    std::fs::write(config.knowledge.source_path(), "x".repeat(50)).unwrap();

    let (outcome, _provider) = run_call(&config, &["What documents do I need?", "Is it interest free?"]).await;

    assert_eq!(outcome.knowledge_available, Some(false));
    assert_eq!(
        outcome.classifications,
        vec![Classification::Unavailable, Classification::Unavailable]
    );
    for note in system_notes(&outcome.conversation) {
        assert!(note.contains("currently unavailable"));
    }
}

#[tokio::test]
async fn missing_narrative_writes_placeholder_and_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(&tmp.path().join("data"));

    let (outcome, _provider) = run_call(&config, &["Tell me about the program"]).await;

    assert_eq!(outcome.knowledge_available, Some(false));
    assert_eq!(outcome.classifications, vec![Classification::Unavailable]);

    let placeholder = std::fs::read_to_string(config.knowledge.source_path()).unwrap();
    assert!(placeholder.contains("Placeholder"));
}

#[tokio::test]
async fn toml_config_drives_persona_and_gate() {
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = tmp.path().join("kb");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("handbook.txt"), NARRATIVE).unwrap();

    let config_path = tmp.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[knowledge]
data_dir = "{}"
file_name = "handbook.txt"
response_mode = "compact"

[retrieval]
min_query_chars = 10

[persona]
language = "Hindi"
knowledge_label = "Admissions Handbook"
"#,
            data_dir.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    let (outcome, _provider) = run_call(&config, &["The fee?", "Explain the No-Cost EMI"]).await;

    assert_eq!(
        outcome.classifications,
        vec![Classification::Empty, Classification::Useful]
    );
    let notes = system_notes(&outcome.conversation);
    assert!(notes[1].starts_with("Relevant information from the Admissions Handbook"));
    assert!(notes[1].contains("Hindi response"));
    assert!(notes[1].contains("No-Cost EMI"));
}

#[tokio::test]
async fn unauthenticated_provider_still_annotates_every_turn() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(tmp.path());
    std::fs::write(config.knowledge.source_path(), NARRATIVE).unwrap();

    let provider = Arc::new(UnauthenticatedProvider { embeds: false });
    let outcome = run_call_with(&config, &["What documents do I need?", "Is it interest free?"], provider).await;

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.knowledge_available, Some(false));
    assert_eq!(
        outcome.classifications,
        vec![Classification::Unavailable, Classification::Unavailable]
    );

    let notes = system_notes(&outcome.conversation);
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.contains("currently unavailable")));
    assert!(notes.iter().all(|n| !n.contains("no key")));
}

#[tokio::test]
async fn failing_answer_synthesis_marks_turns_errored() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(tmp.path());
    std::fs::write(config.knowledge.source_path(), NARRATIVE).unwrap();

    let provider = Arc::new(UnauthenticatedProvider { embeds: true });
    let outcome = run_call_with(&config, &["Which NBFC partners handle the EMI?", "ok"], provider).await;

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.knowledge_available, Some(true));
    assert_eq!(
        outcome.classifications,
        vec![Classification::Errored, Classification::Empty]
    );

    let notes = system_notes(&outcome.conversation);
    assert!(notes[0].contains("Error accessing the NxtWave Onboarding Narrative"));
    assert!(!notes[0].contains("Authentication failed"));
}

#[tokio::test]
async fn blank_input_line_is_annotated_as_minimal() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_for(tmp.path());
    std::fs::write(config.knowledge.source_path(), NARRATIVE).unwrap();

    let (outcome, _provider) = run_call(&config, &["", "exit"]).await;

    assert_eq!(outcome.classifications, vec![Classification::Empty]);
    let notes = system_notes(&outcome.conversation);
    assert!(notes[0].contains("Default Proactive Engagement"));
}
