//! `ragcall run` — Start a call session.

use std::path::Path;
use std::sync::Arc;
use ragcall_agent::SessionBootstrap;
use ragcall_channels::ConsoleTransport;
use ragcall_core::event::{DomainEvent, EventBus};
use ragcall_core::transport::RealtimeTransport;
use tracing::info;

use super::CommandResult;

pub async fn run(config_path: Option<&Path>) -> CommandResult {
    let config = super::load_config(config_path)?;
    super::warn_missing_credentials(&config);
    let _ = super::check_narrative(&config);

    let router = ragcall_providers::router::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let persona = Arc::new(super::build_persona(&config));
    let event_bus = Arc::new(EventBus::default());
    log_events(&event_bus);

    let transport: Arc<dyn RealtimeTransport> = match config.session.transport.as_str() {
        "console" => Arc::new(
            ConsoleTransport::new(provider.clone(), config.text_model())
                .with_max_tokens(config.default_max_tokens),
        ),
        other => return Err(format!("Unknown transport '{other}' (available: console)").into()),
    };

    let service = super::build_service(&config, provider, event_bus.clone());
    let bootstrap = SessionBootstrap::new(
        service,
        transport,
        config.retrieval.clone(),
        config.session.clone(),
        event_bus,
    );

    println!();
    println!("  ragcall — {}", persona.display_line());
    println!("  Language: {}  |  Voice: {}", persona.profile.language, config.session.voice);
    println!("  Knowledge: {}", config.knowledge.source_path().display());
    println!("  Instructions: {} (~{} tokens)", persona.instructions_source, persona.estimated_tokens());
    println!();

    bootstrap.run(persona).await?;
    Ok(())
}

/// Log session milestones from the event bus.
fn log_events(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                DomainEvent::KnowledgeBaseInitialized { available, source, .. } => {
                    info!(available, source = %source, "Knowledge base initialized")
                }
                DomainEvent::SessionStarted { transport, agent_name, .. } => {
                    info!(transport = %transport, agent = %agent_name, "Session started")
                }
                DomainEvent::TurnAnnotated { classification, duration_ms, .. } => {
                    info!(classification = %classification, duration_ms, "Turn annotated")
                }
                DomainEvent::SessionEnded { .. } => break,
            }
        }
    });
}
