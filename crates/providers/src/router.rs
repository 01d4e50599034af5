//! Provider router — builds the configured providers and looks them up by name.

use std::collections::HashMap;
use std::sync::Arc;
use ragcall_config::AppConfig;
use ragcall_core::provider::Provider;
use crate::openai_compat::{GEMINI_BASE_URL, OpenAiCompatProvider};

/// Endpoints of well-known OpenAI-compatible backends.
const KNOWN_ENDPOINTS: &[(&str, &str)] = &[
    ("gemini", GEMINI_BASE_URL),
    ("google", GEMINI_BASE_URL),
    ("openai", "https://api.openai.com/v1"),
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("ollama", "http://localhost:11434/v1"),
    ("groq", "https://api.groq.com/openai/v1"),
    ("together", "https://api.together.xyz/v1"),
    ("vllm", "http://localhost:8000/v1"),
    ("llamacpp", "http://localhost:8080/v1"),
];

pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider named by `default_provider` in the config.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_provider)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }
}

/// Register every `[providers.<name>]` entry plus the default provider.
///
/// A provider without its own key uses the top-level `api_key`; one without
/// `api_url` uses its well-known endpoint.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .as_deref()
            .or(config.api_key.as_deref())
            .unwrap_or_default();
        let base_url = match &provider_config.api_url {
            Some(url) => url.clone(),
            None => endpoint_for(name),
        };
        router.register(name.clone(), Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)));
    }

    if router.get(&config.default_provider).is_none() {
        let name = &config.default_provider;
        let api_key = config.api_key.as_deref().unwrap_or_default();
        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, endpoint_for(name), api_key)),
        );
    }

    router
}

/// Base URL for a provider name; unknown names fall back to Gemini.
fn endpoint_for(name: &str) -> String {
    let key = name.trim().to_lowercase();
    KNOWN_ENDPOINTS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, url)| url.to_string())
        .unwrap_or_else(|| {
            tracing::warn!(provider = %name, "Unknown provider without api_url, using the Gemini endpoint");
            GEMINI_BASE_URL.to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcall_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("gemini");
        router.register("gemini", Arc::new(OpenAiCompatProvider::gemini("AIza-test")));

        assert!(router.get("gemini").is_some());
        assert!(router.get("nonexistent").is_none());
        assert_eq!(router.default().unwrap().name(), "gemini");
    }

    #[test]
    fn known_endpoints() {
        assert_eq!(endpoint_for("gemini"), GEMINI_BASE_URL);
        assert_eq!(endpoint_for("Google"), GEMINI_BASE_URL);
        assert!(endpoint_for("openai").contains("api.openai.com"));
        assert!(endpoint_for("ollama").contains("localhost:11434"));
        assert_eq!(endpoint_for("mystery"), GEMINI_BASE_URL);
    }

    #[test]
    fn build_from_default_config() {
        let router = build_from_config(&AppConfig::default());
        assert_eq!(router.default().unwrap().name(), "gemini");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://gpu-box:11434/v1".into()),
                default_model: None,
            },
        );
        let router = build_from_config(&config);
        assert!(router.get("ollama").is_some());
        assert!(router.get("gemini").is_some());
    }
}
