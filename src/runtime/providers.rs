//! LLM provider resolution
//!
//! Builds the command generator selected by `[generation]`.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use termdeck_core::{CommandGenerator, GenerationConfig, LlmCommandGenerator};
use termdeck_llm::providers::openai_compat::DEFAULT_API_KEY_ENV;
use termdeck_llm::{
    LlmProvider, MockProvider, OllamaConfig, OllamaProvider, OpenAiCompatConfig,
    OpenAiCompatProvider,
};
use tracing::info;

/// Resolve the configured provider; `None` when generation is disabled
pub fn resolve_llm_provider(config: &GenerationConfig) -> Result<Option<Arc<dyn LlmProvider>>> {
    if config.is_disabled() {
        info!("Command generation disabled");
        return Ok(None);
    }

    let provider: Arc<dyn LlmProvider> = match config.provider.to_ascii_lowercase().as_str() {
        "ollama" => {
            let mut ollama = OllamaConfig::from_env()
                .with_timeout(config.timeout())
                .with_max_tokens(config.max_tokens);
            if let Some(url) = &config.base_url {
                ollama = ollama.with_base_url(url);
            }
            if let Some(model) = &config.model {
                ollama = ollama.with_model(model);
            }
            Arc::new(OllamaProvider::new(ollama).context("Failed to create Ollama provider")?)
        }
        "openai" | "openai-compatible" => {
            let key_env = config.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
            let mut openai = OpenAiCompatConfig::from_env_var(key_env)
                .with_context(|| format!("Set {} or choose another provider", key_env))?
                .with_timeout(config.timeout());
            if let Some(url) = &config.base_url {
                openai = openai.with_base_url(url);
            }
            if let Some(model) = &config.model {
                openai = openai.with_model(model);
            }
            Arc::new(
                OpenAiCompatProvider::new(openai).context("Failed to create OpenAI provider")?,
            )
        }
        "mock" => Arc::new(MockProvider::new()),
        other => bail!(
            "Unknown generation provider '{}' (expected ollama, openai, mock or none)",
            other
        ),
    };

    info!(
        provider = %provider.name(),
        model = %provider.default_model(),
        "Registered generation provider"
    );
    Ok(Some(provider))
}

/// Build the command generator used by every tab
pub fn resolve_generator(config: &GenerationConfig) -> Result<Option<Arc<dyn CommandGenerator>>> {
    Ok(resolve_llm_provider(config)?.map(|provider| {
        Arc::new(LlmCommandGenerator::new(provider).with_max_tokens(config.max_tokens))
            as Arc<dyn CommandGenerator>
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(provider: &str) -> GenerationConfig {
        GenerationConfig {
            provider: provider.to_string(),
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn test_none_disables_generation() {
        assert!(resolve_generator(&generation("none")).unwrap().is_none());
        assert!(resolve_generator(&generation("NONE")).unwrap().is_none());
    }

    #[test]
    fn test_mock_provider() {
        let provider = resolve_llm_provider(&generation("mock")).unwrap().unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_ollama_uses_configured_model() {
        let config = GenerationConfig {
            model: Some("llama3.2".to_string()),
            base_url: Some("http://127.0.0.1:9".to_string()),
            ..generation("ollama")
        };
        let provider = resolve_llm_provider(&config).unwrap().unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.default_model(), "llama3.2");
    }

    #[test]
    fn test_openai_without_key_fails() {
        let config = GenerationConfig {
            api_key_env: Some("TERMDECK_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..generation("openai")
        };
        let err = resolve_llm_provider(&config).err().unwrap();
        assert!(err.to_string().contains("TERMDECK_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_unknown_provider_fails() {
        assert!(resolve_llm_provider(&generation("skynet")).is_err());
    }
}
