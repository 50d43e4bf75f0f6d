// Memorai Engine: Embedding Client
//
// Calls Ollama or OpenAI-compatible embedding APIs to produce vector
// representations of text, and implements the `EmbeddingProvider` port.
// Endpoint order per request:
//   1. POST /api/embed        { model, input }  → { embeddings: [[f32…]] }
//   2. POST /api/embeddings   { model, prompt } → { embedding: [f32…] }   (legacy Ollama)
//   3. POST /v1/embeddings    { model, input }  → { data: [{ embedding }] }
// Classification is the local keyword heuristic in engine/classifier.rs.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::EmbeddingProvider;
use crate::atoms::types::TextClassification;
use crate::engine::classifier;
use crate::engine::config::EmbeddingConfig;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    /// Auto-pull is attempted at most once per client.
    pull_attempted: AtomicBool,
}

fn floats(arr: &[Value]) -> Vec<f32> {
    arr.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect()
}

fn looks_like_missing_model(message: &str) -> bool {
    message.contains("not found") || message.contains("404") || message.contains("does not exist")
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Self {
        EmbeddingClient {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            pull_attempted: AtomicBool::new(false),
        }
    }

    /// Get embedding vector for a text string.
    /// Tries Ollama first, pulls a missing model once, then falls back to OpenAI format.
    pub async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let ollama_err = match self.embed_ollama(text).await {
            Ok(vec) => return Ok(vec),
            Err(e) => e,
        };

        if looks_like_missing_model(&ollama_err.to_string()) && !self.pull_attempted.swap(true, Ordering::SeqCst) {
            info!("[embedding] Model '{}' not found, attempting auto-pull...", self.model);
            match self.pull_model().await {
                Ok(()) => {
                    if let Ok(vec) = self.embed_ollama(text).await {
                        return Ok(vec);
                    }
                }
                Err(e) => warn!("[embedding] Auto-pull failed: {}", e),
            }
        }

        match self.embed_openai(text).await {
            Ok(vec) => Ok(vec),
            Err(openai_err) => Err(EngineError::Embedding(format!(
                "Embedding failed. Ollama: {} | OpenAI: {}",
                ollama_err, openai_err
            ))),
        }
    }

    async fn embed_ollama(&self, text: &str) -> EngineResult<Vec<f32>> {
        // ── Current endpoint (Ollama 0.4+) ──
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({ "model": self.model, "input": text });

        if let Ok(resp) = self.client.post(&url).json(&body).timeout(self.timeout).send().await {
            let status = resp.status();
            if status.is_success() {
                if let Ok(v) = resp.json::<Value>().await {
                    let vec = v["embeddings"]
                        .as_array()
                        .and_then(|all| all.first())
                        .and_then(Value::as_array)
                        .or_else(|| v["embedding"].as_array())
                        .map(|arr| floats(arr))
                        .unwrap_or_default();
                    if !vec.is_empty() {
                        return Ok(vec);
                    }
                }
            } else {
                let body = resp.text().await.unwrap_or_default();
                if status.as_u16() == 404 || looks_like_missing_model(&body) {
                    return Err(EngineError::Embedding(format!("Model '{}' not found: {}", self.model, body)));
                }
                debug!("[embedding] /api/embed returned {}, trying legacy endpoint", status);
            }
        }

        // ── Legacy endpoint ──
        let url = format!("{}/api/embeddings", self.base_url);
        let body = json!({ "model": self.model, "prompt": text });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EngineError::Embedding(format!("Ollama not reachable at {}: {}", self.base_url, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Embedding(format!("Ollama embed {}: {}", status, text)));
        }

        let v: Value = resp.json().await?;
        let vec = v["embedding"]
            .as_array()
            .map(|arr| floats(arr))
            .ok_or_else(|| EngineError::Embedding("No 'embedding' array in Ollama response".into()))?;
        if vec.is_empty() {
            return Err(EngineError::Embedding("Empty embedding vector from Ollama".into()));
        }
        Ok(vec)
    }

    async fn embed_openai(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({ "model": self.model, "input": text });
        let resp = self.client.post(&url).json(&body).timeout(self.timeout).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Embedding(format!("OpenAI embed {}: {}", status, text)));
        }

        let v: Value = resp.json().await?;
        parse_openai_embedding(&v)
    }

    /// Check if Ollama is reachable.
    pub async fn check_ollama_running(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Pull the configured model from Ollama. Blocks until the download completes.
    pub async fn pull_model(&self) -> EngineResult<()> {
        let url = format!("{}/api/pull", self.base_url);
        let body = json!({ "name": self.model, "stream": false });
        info!("[embedding] Pulling model '{}' from Ollama (this may take a minute)...", self.model);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(Duration::from_secs(600))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Embedding(format!("Pull failed {}: {}", status, text)));
        }

        let v: Value = resp.json().await.unwrap_or(json!({}));
        info!("[embedding] Model pull complete: {}", v["status"].as_str().unwrap_or("unknown"));
        Ok(())
    }
}

fn parse_openai_embedding(v: &Value) -> EngineResult<Vec<f32>> {
    let vec = v["data"][0]["embedding"]
        .as_array()
        .map(|arr| floats(arr))
        .ok_or_else(|| EngineError::Embedding("No 'data[0].embedding' array in OpenAI response".into()))?;
    if vec.is_empty() {
        return Err(EngineError::Embedding("Empty embedding vector from OpenAI format".into()));
    }
    Ok(vec)
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn generate_embedding(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.embed(text).await
    }

    async fn classify_text(&self, text: &str) -> EngineResult<TextClassification> {
        Ok(classifier::classify(text))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_embedding() {
        let v = json!({ "data": [ { "embedding": [0.25, -0.5, 1.0] } ] });
        assert_eq!(parse_openai_embedding(&v).unwrap(), vec![0.25, -0.5, 1.0]);
        assert!(parse_openai_embedding(&json!({ "data": [] })).is_err());
        assert!(parse_openai_embedding(&json!({ "data": [ { "embedding": [] } ] })).is_err());
    }

    #[test]
    fn test_missing_model_detection() {
        assert!(looks_like_missing_model("model \"all-minilm\" not found, try pulling it first"));
        assert!(!looks_like_missing_model("connection refused"));
    }

    #[tokio::test]
    async fn test_classify_is_local() {
        let client = EmbeddingClient::new(&EmbeddingConfig {
            base_url: "http://127.0.0.1:9/".into(),
            ..Default::default()
        });
        assert_eq!(client.model_name(), "all-minilm");
        let c = client.classify_text("I prefer tabs over spaces").await.unwrap();
        assert_eq!(c.category, "preference");
    }
}
