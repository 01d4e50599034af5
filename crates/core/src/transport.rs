//! Realtime transport trait — the abstraction over the live call session.
//!
//! A transport joins the call room, handles audio I/O and turn detection,
//! and runs the realtime model. ragcall never touches audio: it starts the
//! transport with a static model configuration, registers a [`TurnHook`]
//! that runs after each completed user utterance, and asks for one opening
//! reply once connected.

use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::TransportError;
use crate::message::{Conversation, Message};

/// Static configuration for the realtime model driving the call.
///
/// Built once per session from the persona; never re-derived per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeModelConfig {
    /// Realtime model name
    pub model: String,

    /// Synthesized voice
    pub voice: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Full persona instruction text
    pub instructions: String,

    /// Whether the transport should apply noise cancellation to room input
    #[serde(default)]
    pub noise_cancellation: bool,
}

/// Called by the transport after each completed user turn, before the model
/// generates its reply.
///
/// The hook may only append to `turn_ctx`. Failures are contained inside the
/// hook; nothing it does can end the session.
#[async_trait]
pub trait TurnHook: Send + Sync {
    async fn on_user_turn_completed(&self, turn_ctx: &mut Conversation, new_message: &Message);
}

/// The core RealtimeTransport trait.
///
/// Implementations serialize turn-completion callbacks: the hook for one turn
/// finishes before the next turn is delivered.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Human-readable transport name (e.g., "livekit", "console").
    fn name(&self) -> &str;

    /// Start the session with the given model and turn hook.
    async fn start(
        &self,
        model: RealtimeModelConfig,
        hook: Arc<dyn TurnHook>,
    ) -> std::result::Result<(), TransportError>;

    /// Connect to the call room.
    async fn connect(&self) -> std::result::Result<(), TransportError>;

    /// Ask the model to speak now, following the given one-off instructions.
    async fn generate_reply(&self, instructions: &str) -> std::result::Result<(), TransportError>;

    /// Resolve when the session ends.
    async fn closed(&self) -> std::result::Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingHook {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TurnHook for RecordingHook {
        async fn on_user_turn_completed(&self, turn_ctx: &mut Conversation, new_message: &Message) {
            self.seen.lock().unwrap().push(new_message.content.clone());
            turn_ctx.add_system_note("seen");
        }
    }

    #[tokio::test]
    async fn hook_appends_to_turn_context() {
        let hook = RecordingHook { seen: Mutex::new(vec![]) };
        let mut ctx = Conversation::new();
        let msg = Message::user("What are the EMI options?");
        ctx.push(msg.clone());

        hook.on_user_turn_completed(&mut ctx, &msg).await;

        assert_eq!(ctx.len(), 2);
        assert_eq!(hook.seen.lock().unwrap().as_slice(), ["What are the EMI options?"]);
    }

    #[test]
    fn model_config_serialization() {
        let config = RealtimeModelConfig {
            model: "gemini-live".into(),
            voice: "Aoede".into(),
            temperature: 0.8,
            instructions: "Speak Telugu.".into(),
            noise_cancellation: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("Aoede"));
        assert!(json.contains("noise_cancellation"));
    }
}
