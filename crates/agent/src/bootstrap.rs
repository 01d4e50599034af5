//! Session bootstrap — wires the knowledge base, persona and transport
//! together for one call.
//!
//! # Flow
//!
//! 1. Initialize the knowledge base (awaited before any call traffic)
//! 2. Build the realtime model configuration from the persona, once
//! 3. Start the transport with a [`RagTurnHandler`] as the turn hook
//! 4. Connect, then ask for one opening reply so the agent speaks first
//! 5. Wait for the session to end

use std::sync::Arc;
use chrono::Utc;
use ragcall_config::{RetrievalConfig, SessionConfig};
use ragcall_core::error::TransportError;
use ragcall_core::event::{DomainEvent, EventBus};
use ragcall_core::persona::AgentPersona;
use ragcall_core::transport::{RealtimeModelConfig, RealtimeTransport};
use ragcall_knowledge::RetrievalService;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::gate::RetrievalGate;
use crate::injector::ContextInjector;
use crate::turn::RagTurnHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    Ended,
}

pub struct SessionBootstrap {
    service: Mutex<RetrievalService>,
    transport: Arc<dyn RealtimeTransport>,
    retrieval: RetrievalConfig,
    session: SessionConfig,
    event_bus: Arc<EventBus>,
    state: Mutex<SessionState>,
}

impl SessionBootstrap {
    pub fn new(
        service: RetrievalService,
        transport: Arc<dyn RealtimeTransport>,
        retrieval: RetrievalConfig,
        session: SessionConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            service: Mutex::new(service),
            transport,
            retrieval,
            session,
            event_bus,
            state: Mutex::new(SessionState::NotStarted),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// The static model configuration for a persona.
    pub fn model_config(&self, persona: &AgentPersona) -> RealtimeModelConfig {
        RealtimeModelConfig {
            model: self.session.model.clone(),
            voice: self.session.voice.clone(),
            temperature: self.session.temperature,
            instructions: persona.instructions.clone(),
            noise_cancellation: self.session.noise_cancellation,
        }
    }

    /// Run one call session until the transport closes.
    ///
    /// Only the first call runs; later calls fail with
    /// [`TransportError::AlreadyStarted`].
    pub async fn run(&self, persona: Arc<AgentPersona>) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock().await;
            if *state != SessionState::NotStarted {
                warn!(state = ?*state, "Session bootstrap already used");
                return Err(TransportError::AlreadyStarted);
            }
            *state = SessionState::Running;
        }

        let result = self.run_session(&persona).await;

        *self.state.lock().await = SessionState::Ended;
        self.event_bus.publish(DomainEvent::SessionEnded {
            transport: self.transport.name().to_string(),
            timestamp: Utc::now(),
        });
        info!(transport = %self.transport.name(), "Session ended");

        result
    }

    async fn run_session(&self, persona: &AgentPersona) -> Result<(), TransportError> {
        let index = self.service.lock().await.initialize().await;
        if index.is_none() {
            warn!("Starting session without knowledge base");
        }

        let model = self.model_config(persona);
        let handler = RagTurnHandler::new(
            RetrievalGate::new(&self.retrieval),
            ContextInjector::new(&persona.profile),
            index,
        )
        .with_event_bus(self.event_bus.clone());

        info!(
            transport = %self.transport.name(),
            model = %model.model,
            voice = %model.voice,
            "Starting session"
        );
        self.transport.start(model, Arc::new(handler)).await?;
        self.transport.connect().await?;

        info!("{} connected. Waiting for user interaction.", persona.display_line());
        self.event_bus.publish(DomainEvent::SessionStarted {
            transport: self.transport.name().to_string(),
            agent_name: persona.spoken_name().to_string(),
            timestamp: Utc::now(),
        });

        if let Err(e) = self.transport.generate_reply(&persona.opening_instruction).await {
            warn!(error = %e, "Opening reply failed");
        }
        self.transport.closed().await
    }
}
