//! Domain event system — decoupled observation of a running call.
//!
//! Events are published when something interesting happens: the knowledge
//! base comes up (or doesn't), a session starts or ends, a turn is
//! annotated. Observers subscribe without coupling to the agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::retrieval::Classification;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The knowledge base loader finished
    KnowledgeBaseInitialized {
        available: bool,
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// The transport session is running
    SessionStarted {
        transport: String,
        agent_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A user turn received its retrieval annotation
    TurnAnnotated {
        conversation_id: String,
        classification: Classification,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The transport session ended
    SessionEnded {
        transport: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
