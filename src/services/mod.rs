pub mod catalog;
pub mod chat;
pub mod functions;
pub mod llm;
pub mod reader;
pub mod selection;
#[cfg(not(target_arch = "wasm32"))]
pub mod setup;
#[cfg(not(target_arch = "wasm32"))]
pub mod terminal;
pub mod translation;

use crate::core::config::Config;
use anyhow::{anyhow, Context, Result};
use chat::ChatBackend;
use std::sync::Arc;
use translation::Translator;

#[cfg(target_arch = "wasm32")]
pub trait ClientBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> ClientBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait ClientBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> ClientBounds for T {}

/// Build the translation and chat clients selected by `backend.provider`.
pub fn create_backends(config: &Config) -> Result<(Arc<dyn Translator>, Arc<dyn ChatBackend>)> {
    match config.backend.provider.as_str() {
        "functions" => {
            let cfg = config
                .backend
                .functions
                .as_ref()
                .context("Functions config missing")?;
            let client = Arc::new(functions::FunctionsClient::new(cfg));
            let translator: Arc<dyn Translator> = client.clone();
            let chat: Arc<dyn ChatBackend> = client;
            Ok((translator, chat))
        }
        "gemini" | "ollama" | "openai" => {
            let llm: Arc<dyn llm::LlmClient> = Arc::from(llm::create_llm(&config.backend)?);
            Ok((
                Arc::new(llm::LlmTranslator::new(llm.clone())),
                Arc::new(llm::LlmAssistant::new(llm)),
            ))
        }
        other => Err(anyhow!("Unknown backend provider: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> Config {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_functions_backend_requires_table() {
        let cfg = config("backend:\n  provider: functions\n");
        let err = create_backends(&cfg).err().unwrap();
        assert!(err.to_string().contains("Functions config missing"));
    }

    #[test]
    fn test_llm_backend_is_built() {
        let cfg = config(
            "backend:\n  provider: openai\n  openai:\n    api_key: sk\n    model: gpt-4o-mini\n",
        );
        assert!(create_backends(&cfg).is_ok());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let cfg = config("backend:\n  provider: carrier-pigeon\n");
        let err = create_backends(&cfg).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
