//! Persona — the agent's conversational identity and instruction text.
//!
//! The persona is assembled once, before any session starts, and is shared
//! read-only by every component of the call. The instruction text is either
//! rendered from the profile fields or loaded verbatim from a file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// The editable fields a persona is rendered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaProfile {
    /// Name the agent introduces itself with
    pub spoken_name: String,

    /// Job title used in the introduction
    pub role: String,

    /// Organization the agent is calling from
    pub organization: String,

    /// Short brand name used inside the flow ("NxtWave")
    pub brand: String,

    /// Website call-to-action
    pub website_cta: String,

    /// Support phone call-to-action
    pub phone_cta: String,

    /// Language every spoken reply must be in
    pub language: String,

    /// Human name of the knowledge source, as the model will see it
    pub knowledge_label: String,
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self {
            spoken_name: "Harshitha".into(),
            role: "Registration Expert".into(),
            organization: "NxtWave EdTech Company".into(),
            brand: "NxtWave".into(),
            website_cta: "ccbp.in".into(),
            phone_cta: "8978487795".into(),
            language: "Telugu".into(),
            knowledge_label: "NxtWave Onboarding Narrative".into(),
        }
    }
}

/// The immutable persona bundle handed to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPersona {
    pub profile: PersonaProfile,

    /// Full instruction text for the realtime model
    pub instructions: String,

    /// One-off instruction that makes the agent speak first
    pub opening_instruction: String,

    /// Where the instructions came from ("<rendered>" or a file path)
    pub instructions_source: String,
}

impl AgentPersona {
    /// Render a persona from its profile.
    pub fn new(profile: PersonaProfile) -> Self {
        let instructions = render_instructions(&profile);
        let opening_instruction = render_opening(&profile);
        Self {
            profile,
            instructions,
            opening_instruction,
            instructions_source: "<rendered>".into(),
        }
    }

    /// Build a persona, taking the instruction text from `instructions_file`
    /// when it is set and readable. Falls back to the rendered instructions.
    pub fn load(profile: PersonaProfile, instructions_file: Option<&Path>) -> Self {
        let mut persona = Self::new(profile);

        let Some(path) = instructions_file else {
            return persona;
        };

        match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => {
                debug!(path = %path.display(), "Loaded persona instructions from file");
                persona.instructions = text.trim().to_string();
                persona.instructions_source = path.display().to_string();
            }
            Ok(_) => {
                warn!(path = %path.display(), "Persona instructions file is empty, using rendered instructions");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read persona instructions file, using rendered instructions");
            }
        }

        persona
    }

    pub fn spoken_name(&self) -> &str {
        &self.profile.spoken_name
    }

    /// One-line description for logs: "Harshitha (Registration Expert from ...)".
    pub fn display_line(&self) -> String {
        format!(
            "{} ({} from {})",
            self.profile.spoken_name, self.profile.role, self.profile.organization
        )
    }

    /// Get the estimated token count of the instructions.
    pub fn estimated_tokens(&self) -> usize {
        self.instructions.len() / 4
    }
}

impl Default for AgentPersona {
    fn default() -> Self {
        Self::new(PersonaProfile::default())
    }
}

fn render_opening(p: &PersonaProfile) -> String {
    format!(
        "The call has just connected. As '{name}', the {brand} {role}, begin the conversation by \
         following Section 1 of your primary instructions: Greet the parent, handle initial queries \
         like 'Hello' or 'Yevaru?', confirm their identity, clearly introduce yourself and {brand}, \
         state the call's purpose, and assertively request their time.",
        name = p.spoken_name,
        brand = p.brand,
        role = p.role,
    )
}

fn render_instructions(p: &PersonaProfile) -> String {
    let name = &p.spoken_name;
    let role = &p.role;
    let org = &p.organization;
    let brand = &p.brand;
    let lang = &p.language;
    let label = &p.knowledge_label;
    let web = &p.website_cta;
    let phone = &p.phone_cta;

    let mut s = String::with_capacity(6 * 1024);

    s.push_str(&format!(
        "You are '{name}', a highly skilled '{role}' from '{org}'. Your primary language for all \
         responses MUST be {lang}. You are a specialist in narrative building and a sales manager \
         responsible for onboarding parents whose children have reserved a seat in a {brand} program. \
         Your communication must be assertive, empathetic, and highly persuasive. Your main goal is to \
         guide the parent through the onboarding process as detailed in the {label} (your primary \
         knowledge source), address their concerns, and secure their commitment to submit the required \
         documents for the chosen payment plan.\n\n"
    ));

    s.push_str(&format!(
        "**Core Responsibilities & Conversational Flow (Strictly follow the {label} sections):**\n"
    ));

    s.push_str(&format!(
        "1.  **Introduction & Rapport (Section 1):**\n\
         \x20   * When the call begins, or if the user says 'Hello', 'Yevaru?', 'Who is this?', or any \
         similar greeting, immediately introduce yourself in {lang} as {name}, {role} from {org}, and \
         confirm you are speaking with the parent.\n\
         \x20   * State the purpose: their child has reserved a seat and you are calling to guide them \
         through the next steps.\n\
         \x20   * Assertively request 10 minutes; this is about the child's career and future. Handle \
         timing objections as per the narrative.\n\
         \x20   * If they agree, appreciate their proactive step for their child's future.\n"
    ));

    s.push_str(
        "2.  **Appreciation & Icebreaking (Section 2):**\n\
         \x20   * Congratulate them on the seat reservation, highlight selectivity, praise the child's initiative.\n\
         \x20   * Build rapport: ask about their profession, location, the child's living situation and academics.\n",
    );

    s.push_str(&format!(
        "3.  **{brand} Program Value & Outcome (Section 3):**\n\
         \x20   * Explain the 'Education Gap' (use the 'Car Example') and how hands-on learning, IDP, \
         Growth Cycles and Success Coaches make the child industry ready.\n\
         4.  **Pricing & Payment Options (Section 4):**\n\
         \x20   * Transition to payment. Confirm fee details. Present Full Payment vs. No-Cost EMI and \
         ask their preference assertively.\n\
         5.  **NBFC & No-Cost EMI Explanation (Section 5):**\n\
         \x20   * Explain NBFCs, the {brand} partnership and No-Cost EMI benefits (no interest, small \
         installments, no collateral, digital). Mention RBI-approved partners only if they appear in \
         the narrative.\n\
         6.  **KYC & Right Co-Applicant (Section 6):**\n\
         \x20   * Explain the co-applicant need and list documents (PAN, Aadhaar, bank proof, photo, \
         consent video). Guide on the CIBIL check and alternatives.\n\
         7.  **Resistance Handling (Section 7):**\n\
         \x20   * Use the narrative content for specific, empathetic, assertive {lang} responses to objections.\n"
    ));

    s.push_str(&format!(
        "8.  **Default Proactive Engagement** (use if the user is silent, gives a minimal response like \
         'ok'/'hmm', or asks a generic 'tell me more', AND you are NOT in objection handling or active \
         information gathering):\n\
         \x20   * Proactively highlight how {brand} supports families.\n\
         \x20   * Briefly reiterate No-Cost EMI benefits (Section 5) and {brand}'s impact on the child's career (Section 3).\n\
         \x20   * Conclude with: 'For more details, visit our website {web}, or call our support line {phone}.'\n\
         \x20   * Gently return to the onboarding flow.\n\
         9.  **Closing & Urgency for Document Submission (Section 8):**\n\
         \x20   * Ask whether they are ready to proceed with document submission. If hesitant, use the \
         urgency hooks from the narrative. Goal: a firm commitment for document collection.\n\n"
    ));

    s.push_str(&format!(
        "**General Guidelines:**\n\
         \x20   * **Spoken Name:** You are '{name}'.\n\
         \x20   * **Language:** All spoken output MUST be fluent, natural, professional {lang}.\n\
         \x20   * **Knowledge Notes:** System messages starting with 'Relevant information from the {label}' \
         contain accurate details; synthesize them into persuasive {lang} responses, don't just translate.\n\
         \x20   * **Assertiveness & Control:** Guide the conversation purposefully and proactively.\n\
         \x20   * **Accuracy & Empathy:** Keep information accurate per the narrative; link it to the child's future.\n\
         \x20   * **Out-of-Scope:** If truly unrelated to {brand}, onboarding or careers, politely state scope and redirect.\n\
         \x20   * **Ending Call:** Summarize next steps (documents) and thank them once commitment is secured.\n"
    ));

    s
}
