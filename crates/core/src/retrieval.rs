//! Retrieval seam — the opaque knowledge lookup and its typed outcome.
//!
//! A [`RetrievalIndex`] is built once from the knowledge source and is
//! read-only afterwards. Every user turn produces exactly one [`Answer`],
//! whose classification decides which annotation the model sees.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// Text an index returns when nothing in the source matched the query.
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// A queryable, read-only index over the knowledge source.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Answer a free-text query with a single text response.
    async fn query(&self, text: &str) -> std::result::Result<String, RetrievalError>;
}

/// Coarse outcome of a retrieval attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Useful,
    Empty,
    Unavailable,
    Errored,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Useful => "useful",
            Classification::Empty => "empty",
            Classification::Unavailable => "unavailable",
            Classification::Errored => "errored",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a turn produced no knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The utterance was an acknowledgement ("ok", "hmm"); no query was made.
    InputTooShort,
    /// The index was queried but had nothing relevant.
    NoMatch,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyReason::InputTooShort => "input too short",
            EmptyReason::NoMatch => "no match",
        }
    }
}

/// The result of one retrieval attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "snake_case")]
pub enum Answer {
    /// Relevant content, kept verbatim.
    Useful { content: String },
    Empty { reason: EmptyReason },
    /// No index exists in this process.
    Unavailable,
    /// The query failed; `detail` is for logs only.
    Errored { detail: String },
}

impl Answer {
    pub fn useful(content: impl Into<String>) -> Self {
        Answer::Useful { content: content.into() }
    }

    pub fn empty(reason: EmptyReason) -> Self {
        Answer::Empty { reason }
    }

    pub fn errored(detail: impl Into<String>) -> Self {
        Answer::Errored { detail: detail.into() }
    }

    pub fn classification(&self) -> Classification {
        match self {
            Answer::Useful { .. } => Classification::Useful,
            Answer::Empty { .. } => Classification::Empty,
            Answer::Unavailable => Classification::Unavailable,
            Answer::Errored { .. } => Classification::Errored,
        }
    }

    /// Retrieved text, only present for useful answers.
    pub fn content(&self) -> Option<&str> {
        match self {
            Answer::Useful { content } => Some(content),
            _ => None,
        }
    }
}
