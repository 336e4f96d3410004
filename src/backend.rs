//! Language-model backend abstraction and implementations.
//!
//! Defines the [`TextGenerator`] trait and concrete implementations:
//! - **[`DisabledBackend`]** — returns errors; used when no backend is configured.
//! - **[`OllamaBackend`]** — calls a local Ollama server's `/api/generate`
//!   endpoint with bounded retry and backoff.
//!
//! The pipeline treats this capability as opaque: failures surface to it
//! as `Err`, which the calling stage embeds as an error *string* in the
//! field it would have populated, never as a pipeline abort.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BackendConfig;

/// Opaque text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend identifier for display (e.g. `"ollama/llama2"`).
    fn name(&self) -> &str;

    /// Generates a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A no-op backend that always returns errors. Used when
/// `backend.provider = "disabled"`; the pipeline still runs, with the
/// prose fields reporting the missing backend.
pub struct DisabledBackend;

#[async_trait]
impl TextGenerator for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("language-model backend is disabled")
    }
}

/// Backend using a local Ollama server.
///
/// Calls `POST {base_url}/api/generate` with `stream: false` and returns
/// the `response` field.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    display_name: String,
    max_retries: u32,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("backend.model required for Ollama backend"))?;
        // One client per backend: reqwest pools connections internally.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            display_name: format!("ollama/{}", model),
            model,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaBackend {
    fn name(&self) -> &str {
        &self.display_name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let url = format!("{}/api/generate", self.base_url);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_ollama_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Ollama error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("generation failed after retries")))
    }
}

/// Extracts the `response` field from an Ollama generate reply.
fn parse_ollama_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

/// Create the appropriate [`TextGenerator`] based on configuration.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledBackend)),
        "ollama" => Ok(Arc::new(OllamaBackend::new(config)?)),
        other => bail!("Unknown backend provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_response_field() {
        let json = serde_json::json!({ "model": "llama2", "response": "hello", "done": true });
        assert_eq!(parse_ollama_response(&json).unwrap(), "hello");
    }

    #[test]
    fn parse_missing_field_is_error() {
        let json = serde_json::json!({ "done": true });
        assert!(parse_ollama_response(&json).is_err());
    }

    #[test]
    fn create_disabled_backend() {
        let backend = create_backend(&BackendConfig::default()).unwrap();
        assert_eq!(backend.name(), "disabled");
    }

    #[test]
    fn ollama_backend_constructs_with_model() {
        let config = BackendConfig {
            provider: "ollama".to_string(),
            model: Some("llama2".to_string()),
            ..BackendConfig::default()
        };
        let backend = OllamaBackend::new(&config).unwrap();
        assert_eq!(backend.name(), "ollama/llama2");
    }

    #[test]
    fn ollama_requires_model() {
        let config = BackendConfig {
            provider: "ollama".to_string(),
            ..BackendConfig::default()
        };
        assert!(create_backend(&config).is_err());
    }

    #[tokio::test]
    async fn disabled_backend_generate_fails() {
        let err = DisabledBackend.generate("prompt").await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }
}
