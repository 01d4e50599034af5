//! `ragcall doctor` — Diagnose configuration and knowledge base health.

use std::path::Path;
use std::sync::Arc;
use ragcall_config::AppConfig;
use ragcall_core::error::{KnowledgeError, ProviderError};
use ragcall_core::provider::Provider;

use super::CommandResult;

pub async fn run(config_path: Option<&Path>) -> CommandResult {
    println!("🩺 ragcall Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    // Check config
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ✅ Config file found at {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults", path.display());
    }

    let config = match AppConfig::load_with(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    // Check credentials
    if config.has_api_key() {
        println!("  ✅ API credentials configured");
    } else {
        println!("  ⚠️  No API key — set GOOGLE_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    // Check provider
    match ragcall_providers::router::build_from_config(&config).default() {
        Some(provider) => {
            if let Err(e) = check_provider(provider).await {
                println!("  ❌ Provider '{}' not usable: {e}", config.default_provider);
                issues += 1;
            } else {
                println!("  ✅ Provider '{}' reachable", config.default_provider);
            }
        }
        None => {
            println!("  ❌ No provider named '{}'", config.default_provider);
            issues += 1;
        }
    }

    // Check narrative
    let source = config.knowledge.source_path();
    match super::check_narrative(&config) {
        Ok(()) => println!("  ✅ Narrative file valid ({})", source.display()),
        Err(KnowledgeError::Missing(_)) => {
            println!("  ❌ Narrative file missing: {}", source.display());
            println!("     A placeholder is written on first run; replace it with the real narrative.");
            issues += 1;
        }
        Err(KnowledgeError::Placeholder(_)) => {
            println!("  ❌ Narrative file still appears to be a placeholder: {}", source.display());
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Check persona
    let persona = super::build_persona(&config);
    println!(
        "  ✅ Persona: {} speaking {} (instructions: {})",
        persona.display_line(),
        persona.profile.language,
        persona.instructions_source
    );
    if let Some(file) = &config.persona.instructions_file {
        if persona.instructions_source == "<rendered>" {
            println!("  ⚠️  Instructions file {} not used (missing or empty)", file.display());
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Reachable and accepting the configured key.
async fn check_provider(provider: Arc<dyn Provider>) -> Result<(), ProviderError> {
    if provider.health_check().await? {
        Ok(())
    } else {
        Err(ProviderError::NotConfigured(format!(
            "{} did not answer the health check",
            provider.name()
        )))
    }
}
