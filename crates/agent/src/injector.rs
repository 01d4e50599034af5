//! Context injector — turns an [`Answer`] into one system note for the model.
//!
//! Exactly one note is appended per user turn. Error details stay in the
//! logs; the model only ever sees a neutral cautionary note.

use ragcall_core::message::{Conversation, Message};
use ragcall_core::persona::PersonaProfile;
use ragcall_core::retrieval::{Answer, EmptyReason};

/// Metadata key marking a system note as a retrieval annotation.
pub const ANNOTATION_METADATA_KEY: &str = "retrieval";

pub struct ContextInjector {
    knowledge_label: String,
    language: String,
}

impl ContextInjector {
    pub fn new(profile: &PersonaProfile) -> Self {
        Self {
            knowledge_label: profile.knowledge_label.clone(),
            language: profile.language.clone(),
        }
    }

    /// The note text for an answer.
    pub fn annotation(&self, answer: &Answer) -> String {
        let label = &self.knowledge_label;
        match answer {
            Answer::Useful { content } => format!(
                "Relevant information from the {label}: '{content}'. Use this to inform your {} \
                 response, adhering to your role and the conversational flow outlined in your \
                 primary instructions.",
                self.language
            ),
            Answer::Empty {
                reason: EmptyReason::InputTooShort,
            } => "User input was minimal. Assess conversational context. If appropriate, and not \
                  in a critical flow or objection handling, consider the 'Default Proactive \
                  Engagement' strategy from your primary instructions."
                .to_string(),
            Answer::Empty {
                reason: EmptyReason::NoMatch,
            } => format!(
                "Internal note: No specific information found in the {label} for the user's last \
                 input. Continue based on primary instructions. If a direct question was asked \
                 that you can't answer, acknowledge that or use default proactive engagement if \
                 applicable."
            ),
            Answer::Unavailable => format!(
                "Internal note: Knowledge base ({label}) is currently unavailable. Proceed based \
                 on general instructions. Be cautious about making specific claims that require \
                 the narrative."
            ),
            Answer::Errored { .. } => {
                format!("Internal note: Error accessing the {label}. Proceed with caution.")
            }
        }
    }

    /// Append the note for `answer` to the turn context.
    pub fn annotate(&self, context: &mut Conversation, answer: &Answer) {
        let note = Message::system(self.annotation(answer)).with_metadata(
            ANNOTATION_METADATA_KEY,
            serde_json::Value::String(answer.classification().as_str().to_string()),
        );
        context.push(note);
    }
}

impl Default for ContextInjector {
    fn default() -> Self {
        Self::new(&PersonaProfile::default())
    }
}
