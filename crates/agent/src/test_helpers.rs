//! Shared test doubles for the agent crate.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use ragcall_config::KnowledgeConfig;
use ragcall_core::error::{KnowledgeError, RetrievalError, TransportError};
use ragcall_core::message::{Conversation, Message};
use ragcall_core::retrieval::RetrievalIndex;
use ragcall_core::transport::{RealtimeModelConfig, RealtimeTransport, TurnHook};
use ragcall_knowledge::KnowledgeSource;
use ragcall_knowledge::service::IndexBuilder;
use tokio::sync::Mutex;

enum StubBehavior {
    Answer(String),
    Fail(String),
    Panic,
}

/// A retrieval index with a canned behavior that counts its queries.
pub struct StubIndex {
    behavior: StubBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_query: StdMutex<Option<String>>,
}

impl StubIndex {
    fn with_behavior(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
            last_query: StdMutex::new(None),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::with_behavior(StubBehavior::Answer(text.into()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_behavior(StubBehavior::Fail(message.into()))
    }

    pub fn panicking() -> Self {
        Self::with_behavior(StubBehavior::Panic)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalIndex for StubIndex {
    async fn query(&self, text: &str) -> Result<String, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(text.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            StubBehavior::Answer(text) => Ok(text.clone()),
            StubBehavior::Fail(message) => Err(RetrievalError::QueryFailed(message.clone())),
            StubBehavior::Panic => panic!("index exploded"),
        }
    }
}

/// Builds a [`StubIndex`] answering a fixed text, counting builds.
pub struct StubBuilder {
    answer: String,
    builds: AtomicUsize,
}

impl StubBuilder {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: text.into(),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexBuilder for StubBuilder {
    async fn build(&self, _source: &KnowledgeSource) -> Result<Arc<dyn RetrievalIndex>, KnowledgeError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubIndex::answering(&self.answer)))
    }
}

/// Write a valid narrative for `config`.
pub fn write_narrative(config: &KnowledgeConfig) {
    std::fs::create_dir_all(&config.data_dir).unwrap();
    std::fs::write(
        config.source_path(),
        "Section 5: No-Cost EMI. NxtWave partners with NBFCs so parents can pay the program \
         fee in small monthly installments with no interest. Section 6: KYC. The co-applicant \
         shares PAN, Aadhaar and bank proof and records a short consent video.",
    )
    .unwrap();
}

/// A transport that replays scripted user utterances through the turn hook
/// when the session is awaited.
pub struct ScriptedTransport {
    utterances: Vec<String>,
    fail_connect: bool,
    fail_replies: bool,
    hook: Mutex<Option<Arc<dyn TurnHook>>>,
    model: Mutex<Option<RealtimeModelConfig>>,
    replies: Mutex<Vec<String>>,
    conversation: Mutex<Conversation>,
    start_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(utterances: &[&str]) -> Self {
        Self {
            utterances: utterances.iter().map(|u| u.to_string()).collect(),
            fail_connect: false,
            fail_replies: false,
            hook: Mutex::new(None),
            model: Mutex::new(None),
            replies: Mutex::new(Vec::new()),
            conversation: Mutex::new(Conversation::new()),
            start_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Every reply request is recorded, then rejected.
    pub fn failing_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    pub async fn model(&self) -> Option<RealtimeModelConfig> {
        self.model.lock().await.clone()
    }

    pub async fn reply_instructions(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }

    pub async fn conversation(&self) -> Conversation {
        self.conversation.lock().await.clone()
    }

    pub async fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start(&self, model: RealtimeModelConfig, hook: Arc<dyn TurnHook>) -> Result<(), TransportError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let mut conv = self.conversation.lock().await;
        *conv = Conversation::with_system_prompt(model.instructions.clone());
        *self.model.lock().await = Some(model);
        *self.hook.lock().await = Some(hook);
        Ok(())
    }

    async fn connect(&self) -> Result<(), TransportError> {
        if self.fail_connect {
            return Err(TransportError::ConnectionFailed("room not found".into()));
        }
        Ok(())
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), TransportError> {
        self.replies.lock().await.push(instructions.to_string());
        if self.fail_replies {
            return Err(TransportError::ReplyFailed("Authentication failed: no key".into()));
        }
        Ok(())
    }

    async fn closed(&self) -> Result<(), TransportError> {
        let hook = self.hook.lock().await.clone().ok_or(TransportError::NotStarted)?;
        let mut conv = self.conversation.lock().await;

        for utterance in &self.utterances {
            let message = Message::user(utterance.clone());
            conv.push(message.clone());
            hook.on_user_turn_completed(&mut conv, &message).await;
        }
        Ok(())
    }
}
