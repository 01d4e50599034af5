//! Retrieval gate — decides, per user turn, whether and how to query the index.
//!
//! The gate never touches the conversation. It turns an utterance into
//! exactly one [`Answer`]:
//!
//! | condition                                   | answer                   |
//! |---------------------------------------------|--------------------------|
//! | no index                                    | `Unavailable`            |
//! | trimmed utterance ≤ `min_query_chars` chars  | `Empty(InputTooShort)`   |
//! | query failed, panicked or timed out         | `Errored`                |
//! | blank result or the empty sentinel          | `Empty(NoMatch)`         |
//! | anything else                               | `Useful` (verbatim)      |
//!
//! Queries run on a separate task so a slow index never blocks the
//! caller's runtime thread; a semaphore bounds how many run at once.

use std::sync::Arc;
use std::time::Duration;
use ragcall_config::RetrievalConfig;
use ragcall_core::error::RetrievalError;
use ragcall_core::retrieval::{Answer, EmptyReason, RetrievalIndex};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub struct RetrievalGate {
    min_query_chars: usize,
    empty_sentinel: String,
    timeout: Duration,
    workers: Arc<Semaphore>,
}

impl RetrievalGate {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            min_query_chars: config.min_query_chars,
            empty_sentinel: config.empty_sentinel.trim().to_lowercase(),
            timeout: Duration::from_secs(config.timeout_secs),
            workers: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        }
    }

    /// Produce the answer for one user utterance.
    pub async fn handle_turn(
        &self,
        utterance: &str,
        index: Option<&Arc<dyn RetrievalIndex>>,
    ) -> Answer {
        let Some(index) = index else {
            return Answer::Unavailable;
        };

        let query = utterance.trim();
        if query.chars().count() <= self.min_query_chars {
            debug!(utterance = %query, "Utterance too short for retrieval");
            return Answer::empty(EmptyReason::InputTooShort);
        }

        debug!(query = %query, "Querying knowledge base");

        match self.query_offloaded(index.clone(), query.to_string()).await {
            Ok(text) => self.classify(text),
            Err(e) => {
                warn!(error = %e, "Knowledge base query failed");
                Answer::errored(e.to_string())
            }
        }
    }

    async fn query_offloaded(
        &self,
        index: Arc<dyn RetrievalIndex>,
        query: String,
    ) -> Result<String, RetrievalError> {
        let workers = self.workers.clone();
        let mut handle = tokio::spawn(async move {
            let _permit = workers
                .acquire_owned()
                .await
                .map_err(|e| RetrievalError::WorkerAborted(e.to_string()))?;
            index.query(&query).await
        });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(RetrievalError::WorkerAborted(join_err.to_string())),
            Err(_) => {
                handle.abort();
                Err(RetrievalError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }

    fn classify(&self, text: String) -> Answer {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.to_lowercase() == self.empty_sentinel {
            debug!("Knowledge base had no match");
            return Answer::empty(EmptyReason::NoMatch);
        }
        Answer::Useful { content: text }
    }
}

impl Default for RetrievalGate {
    fn default() -> Self {
        Self::new(&RetrievalConfig::default())
    }
}
