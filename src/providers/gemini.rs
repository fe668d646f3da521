// src/providers/gemini.rs

//! Gemini client: embeddings (embedContent) and text generation
//! (generateContent) over the REST API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::TextGenerator;
use crate::config::AssistantConfig;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    embed_model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiClient {
    pub fn new(config: &AssistantConfig) -> Self {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.gemini_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            embed_model: config.gemini_embed_model.clone(),
        }
    }

    /// Embed a text for similarity search. 768 dimensions for embedding-001.
    pub async fn embed(&self, text: &str, task_type: &str) -> Result<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY not configured"));
        }

        let url = format!(
            "{}/{}:embedContent?key={}",
            GEMINI_API_BASE, self.embed_model, self.api_key
        );
        let body = json!({
            "model": format!("models/{}", self.embed_model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type,
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini embed failed ({status}): {detail}"));
        }

        let parsed: EmbedResponse = resp.json().await?;
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY not configured"));
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini generation failed ({status}): {detail}"));
        }

        let value: serde_json::Value = resp.json().await?;
        let text = value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("Gemini response missing candidate text"))?
            .to_string();

        tracing::debug!(
            target: "providers::gemini",
            prompt_chars = prompt.len(),
            response_chars = text.len(),
            "generation complete"
        );
        Ok(text)
    }
}
