//! `ragcall query` — Run one utterance through the retrieval gate.
//!
//! Prints the classification and the exact note the model would receive.

use std::path::Path;
use std::sync::Arc;
use ragcall_agent::{ContextInjector, RetrievalGate};
use ragcall_core::event::EventBus;

use super::CommandResult;

pub async fn run(config_path: Option<&Path>, text: &str, json: bool) -> CommandResult {
    let config = super::load_config(config_path)?;
    super::warn_missing_credentials(&config);

    let router = ragcall_providers::router::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let mut service = super::build_service(&config, provider, Arc::new(EventBus::default()));
    let index = service.initialize().await;

    let gate = RetrievalGate::new(&config.retrieval);
    let injector = ContextInjector::new(&config.persona.profile);

    let answer = gate.handle_turn(text, index.as_ref()).await;
    let note = injector.annotation(&answer);

    if json {
        let output = serde_json::json!({
            "answer": answer,
            "annotation": note,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Classification: {}", answer.classification());
        if let Some(content) = answer.content() {
            println!("Retrieved:\n{content}\n");
        }
        println!("Annotation:\n{note}");
    }

    Ok(())
}
