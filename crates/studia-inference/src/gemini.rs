//! Gemini inference backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use studia_core::{defaults, Error, GenerationBackend, Result};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_URL: &str = defaults::GEN_BASE_URL;

/// Model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_GEN_MODEL: &str = defaults::GEN_MODEL;

/// Request timeout for generation calls, in seconds.
pub const GEN_TIMEOUT_SECS: u64 = defaults::GEN_TIMEOUT_SECS;

/// Generations slower than this get a dedicated warning.
const SLOW_GENERATION_MS: u64 = 30_000;

/// Gemini inference backend.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    gen_model: String,
    gen_timeout_secs: u64,
}

impl GeminiBackend {
    /// Create a new Gemini backend with default settings.
    pub fn new(api_key: String) -> Self {
        Self::with_config(
            DEFAULT_GEMINI_URL.to_string(),
            api_key,
            DEFAULT_GEN_MODEL.to_string(),
        )
    }

    /// Create a new Gemini backend with custom configuration.
    pub fn with_config(base_url: String, api_key: String, gen_model: String) -> Self {
        let gen_timeout = std::env::var("STUDIA_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::GEN_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(gen_timeout))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "inference",
            component = "gemini",
            model = %gen_model,
            "Initializing Gemini backend"
        );

        Self {
            client,
            base_url,
            api_key,
            gen_model,
            gen_timeout_secs: gen_timeout,
        }
    }

    /// Build a backend from the process environment.
    ///
    /// Requires `GEMINI_API_KEY`; `GEMINI_BASE_URL` and `GEMINI_MODEL`
    /// override the defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY is not set".to_string()))?;
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_URL.to_string());
        let gen_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEN_MODEL.to_string());

        Ok(Self::with_config(base_url, api_key, gen_model))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    #[instrument(skip(self, prompt), fields(subsystem = "inference", component = "gemini", op = "generate", model = %self.gen_model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.gen_model
            ))
            .query(&[("key", self.api_key.as_str())])
            .timeout(Duration::from_secs(self.gen_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Failed to parse response: {}", e)))?;

        let content: String = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = content.len(),
            duration_ms = elapsed,
            "Generation finished"
        );
        if elapsed > SLOW_GENERATION_MS {
            warn!(
                duration_ms = elapsed,
                prompt_len = prompt.len(),
                slow = true,
                "Generation exceeded slow threshold"
            );
        }
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.gen_model
    }
}

/// One text fragment inside a content block.
#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Content block for the `generateContent` endpoint.
#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Request payload for `models/{model}:generateContent`.
#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Response from `models/{model}:generateContent`. Safety-blocked
/// responses come back with no candidates at all.
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
