//! # ragcall Core
//!
//! Domain types, traits, and error definitions for the ragcall voice sales
//! agent. This crate has **no framework dependencies** beyond serde and
//! tokio's sync primitives: it defines the domain model every other crate
//! implements against.
//!
//! ## Seams
//!
//! The three external collaborators of the dialogue controller are traits here:
//! - [`Provider`] — LLM inference and embeddings
//! - [`RetrievalIndex`] — the opaque `query(text) -> text` knowledge lookup
//! - [`RealtimeTransport`] — the live call session that delivers completed
//!   user turns to a [`TurnHook`]

pub mod error;
pub mod event;
pub mod message;
pub mod persona;
pub mod provider;
pub mod retrieval;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Role};
pub use persona::AgentPersona;
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use retrieval::{Answer, Classification, EmptyReason, RetrievalIndex};
pub use transport::{RealtimeModelConfig, RealtimeTransport, TurnHook};
