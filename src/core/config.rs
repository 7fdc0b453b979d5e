use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::catalog::CatalogConfig;
use crate::services::functions::FunctionsConfig;
use crate::services::llm::{GeminiConfig, OllamaConfig, OpenAIConfig};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    pub backend: BackendConfig,

    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Where translation and chat requests go.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_provider")]
    pub provider: String, // "functions", "gemini", "ollama" or "openai"
    pub functions: Option<FunctionsConfig>,
    pub gemini: Option<GeminiConfig>,
    pub ollama: Option<OllamaConfig>,
    pub openai: Option<OpenAIConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReaderConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            languages: default_languages(),
        }
    }
}

fn default_provider() -> String {
    "functions".to_string()
}
fn default_page_size() -> usize {
    crate::utils::pages::PAGE_SIZE
}
fn default_languages() -> Vec<String> {
    ["hi", "es", "fr", "de", "ja", "zh"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        if !path.exists() {
            anyhow::bail!("config.yml not found. Please create one.");
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
