//! Ollama-backed canonicalization oracle.
//!
//! Talks to the Ollama REST API over blocking HTTP. Each batch is one
//! `/api/generate` round-trip in JSON mode at a fixed temperature.

use serde::{Deserialize, Serialize};

use super::{CanonicalizationOracle, OracleError, OracleResult, build_prompt, parse_groups};
use crate::model::EntityGroup;

/// Configuration for the Ollama client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name to use.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature; 0 keeps groupings reproducible.
    #[serde(default)]
    pub temperature: f32,
    /// Extra attempts for a batch whose response fails to parse.
    #[serde(default)]
    pub retries: u32,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
            retries: 0,
        }
    }
}

/// Client for the Ollama REST API.
pub struct OllamaClient {
    config: OllamaConfig,
    available: bool,
    /// Models available locally after `probe()`.
    available_models: Vec<String>,
}

impl OllamaClient {
    /// Create a new Ollama client with the given configuration.
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            config,
            available: false,
            available_models: Vec::new(),
        }
    }

    /// Probe the Ollama server to check availability.
    ///
    /// Sends a lightweight request to the `/api/tags` endpoint,
    /// parses the list of locally available models.
    pub fn probe(&mut self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();

        match agent.get(&url).call() {
            Ok(resp) => {
                if resp.status() != 200 {
                    self.available = false;
                    return false;
                }
                self.available = true;

                if let Ok(body) = resp.into_string() {
                    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
                        self.available_models = json["models"]
                            .as_array()
                            .map(|arr| {
                                arr.iter()
                                    .filter_map(|m| m["name"].as_str().map(|s| s.to_string()))
                                    .collect()
                            })
                            .unwrap_or_default();
                    }
                }

                true
            }
            Err(_) => {
                self.available = false;
                self.available_models.clear();
                false
            }
        }
    }

    /// Whether the configured model is locally available.
    pub fn has_model(&self) -> bool {
        let target = &self.config.model;
        self.available_models
            .iter()
            .any(|m| m == target || m.split(':').next() == Some(target))
    }

    /// Models reported by the last successful `probe()`.
    pub fn available_models(&self) -> &[String] {
        &self.available_models
    }

    /// Ensure the configured model is available, pulling it if necessary.
    ///
    /// Call this after `probe()` returns true, before the first batch.
    pub fn ensure_model(&mut self) -> OracleResult<()> {
        if !self.available {
            return Err(OracleError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }

        if self.has_model() {
            return Ok(());
        }

        tracing::info!(model = %self.config.model, "pulling model, this may take a few minutes");

        let url = format!("{}/api/pull", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(600)) // pulls can be slow
            .build();

        let body = serde_json::json!({
            "name": self.config.model,
            "stream": false,
        });

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e: ureq::Error| OracleError::ModelPull {
                model: self.config.model.clone(),
                message: e.to_string(),
            })?;

        if resp.status() == 200 {
            // Re-probe to refresh model list.
            self.probe();
            Ok(())
        } else {
            Err(OracleError::ModelPull {
                model: self.config.model.clone(),
                message: format!("server returned status {}", resp.status()),
            })
        }
    }

    /// Whether the Ollama server is available.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Generate a completion constrained to JSON output.
    pub fn generate_json(&self, prompt: &str) -> OracleResult<String> {
        if !self.available {
            return Err(OracleError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }

        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "format": "json",
            "stream": false,
            "options": { "temperature": self.config.temperature },
        });

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e: ureq::Error| OracleError::RequestFailed {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| OracleError::RequestFailed {
            message: format!("reading response body: {e}"),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| OracleError::RequestFailed {
                message: format!("malformed Ollama envelope: {e}"),
            })?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| OracleError::RequestFailed {
                message: "missing 'response' field".into(),
            })
    }

    /// Get the model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("available", &self.available)
            .finish()
    }
}

/// Canonicalization oracle answering each batch with one Ollama generation.
#[derive(Debug)]
pub struct OllamaOracle {
    client: OllamaClient,
}

impl OllamaOracle {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

impl CanonicalizationOracle for OllamaOracle {
    fn batch_canonicalize(
        &self,
        entity_type: &str,
        values: &[String],
    ) -> OracleResult<Vec<EntityGroup>> {
        let prompt = build_prompt(entity_type, values);
        tracing::debug!(
            entity_type,
            values = values.len(),
            model = self.client.model(),
            "canonicalizing batch"
        );
        let response = self.client.generate_json(&prompt)?;
        parse_groups(entity_type, &response)
    }
}
