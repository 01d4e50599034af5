//! The per-turn retrieval pipeline and the call session around it.
//!
//! For every completed user utterance:
//!
//! 1. **Gate** ([`RetrievalGate`]): decide whether to query the knowledge
//!    index and classify the outcome as an [`Answer`]
//! 2. **Inject** ([`ContextInjector`]): append exactly one system note
//!    describing that answer to the turn context
//!
//! [`RagTurnHandler`] runs both as the transport's turn hook, and
//! [`SessionBootstrap`] sets up the knowledge base, persona and transport
//! for one call.
//!
//! [`Answer`]: ragcall_core::Answer

pub mod bootstrap;
pub mod gate;
pub mod injector;
pub mod turn;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use bootstrap::{SessionBootstrap, SessionState};
pub use gate::RetrievalGate;
pub use injector::ContextInjector;
pub use turn::RagTurnHandler;
