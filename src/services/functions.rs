use crate::services::chat::{ChatBackend, ChatReply, ChatRequest};
use crate::services::translation::Translator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FunctionsConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Client for hosted serverless functions (`/functions/v1/<name>`).
#[derive(Debug)]
pub struct FunctionsClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateBody<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateReply {
    translated_text: String,
}

impl FunctionsClient {
    pub fn new(config: &FunctionsConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    async fn invoke<B: Serialize + ?Sized, T: DeserializeOwned>(&self, name: &str, body: &B) -> Result<T> {
        let mut request = self.client.post(self.url(name)).json(body);
        if !self.api_key.is_empty() {
            request = request
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("apikey", &self.api_key);
        }

        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(anyhow!("Function {} error ({}): {}", name, status, error_text));
        }

        let body = resp.text().await?;
        decode(name, &body)
    }
}

/// Parse a function response body. An `error` member means failure even with a 2xx status.
fn decode<T: DeserializeOwned>(name: &str, body: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| anyhow!("Failed to parse {} response: {}. Body: {}", name, e, body))?;

    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        return Err(anyhow!("Function {} returned error: {}", name, err));
    }

    serde_json::from_value(value)
        .map_err(|e| anyhow!("Unexpected {} response: {}. Body: {}", name, e, body))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Translator for FunctionsClient {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let reply: TranslateReply = self
            .invoke("translate", &TranslateBody { text, target_language })
            .await?;
        Ok(reply.translated_text)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ChatBackend for FunctionsClient {
    async fn reply(&self, request: &ChatRequest) -> Result<String> {
        let reply: ChatReply = self.invoke("chat", request).await?;
        Ok(reply.message)
    }
}
