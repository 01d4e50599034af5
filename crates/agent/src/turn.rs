//! The turn hook the transport calls after each completed user utterance.
//!
//! Runs the gate, then the injector, so the model's next reply sees one
//! retrieval note appended after the user's message.

use std::sync::Arc;
use std::time::Instant;
use async_trait::async_trait;
use chrono::Utc;
use ragcall_core::event::{DomainEvent, EventBus};
use ragcall_core::message::{Conversation, Message};
use ragcall_core::retrieval::{Answer, EmptyReason, RetrievalIndex};
use ragcall_core::transport::TurnHook;
use tracing::{debug, info};

use crate::gate::RetrievalGate;
use crate::injector::ContextInjector;

/// Characters of retrieved content shown in debug logs.
const PREVIEW_CHARS: usize = 250;

pub struct RagTurnHandler {
    gate: RetrievalGate,
    injector: ContextInjector,
    index: Option<Arc<dyn RetrievalIndex>>,
    event_bus: Option<Arc<EventBus>>,
}

impl RagTurnHandler {
    pub fn new(
        gate: RetrievalGate,
        injector: ContextInjector,
        index: Option<Arc<dyn RetrievalIndex>>,
    ) -> Self {
        Self {
            gate,
            injector,
            index,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Gate and annotate one turn, returning the answer that was applied.
    pub async fn process_turn(&self, turn_ctx: &mut Conversation, new_message: &Message) -> Answer {
        let utterance = new_message.text_content();
        info!(utterance = %utterance, "User says");

        let started = Instant::now();
        let answer = self.gate.handle_turn(utterance, self.index.as_ref()).await;
        log_answer(&answer);

        self.injector.annotate(turn_ctx, &answer);

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::TurnAnnotated {
                conversation_id: turn_ctx.id.0.clone(),
                classification: answer.classification(),
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
        }

        answer
    }
}

#[async_trait]
impl TurnHook for RagTurnHandler {
    async fn on_user_turn_completed(&self, turn_ctx: &mut Conversation, new_message: &Message) {
        self.process_turn(turn_ctx, new_message).await;
    }
}

fn log_answer(answer: &Answer) {
    match answer {
        Answer::Useful { content } => {
            let preview: String = content.chars().take(PREVIEW_CHARS).collect();
            debug!(chars = content.chars().count(), preview = %preview, "Injecting retrieved content");
        }
        Answer::Empty {
            reason: EmptyReason::InputTooShort,
        } => debug!("Minimal input; suggesting proactive engagement"),
        Answer::Empty {
            reason: EmptyReason::NoMatch,
        } => info!("No relevant narrative content for this turn"),
        Answer::Unavailable => {
            info!("Knowledge base not available; relying on general instructions")
        }
        // The gate has already logged the error
        Answer::Errored { .. } => {}
    }
}
