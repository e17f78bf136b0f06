//! Mock generation backend for deterministic testing.
//!
//! Scripted responses play back in order; prompt mappings answer by
//! substring match; otherwise the fixed default response is returned.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use studia_inference::mock::MockGenerationBackend;
//!
//! let backend = MockGenerationBackend::new()
//!     .with_response_mapping("知识树", r#"{"tree": {"name": "方程"}}"#)
//!     .with_fixed_response("{}");
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use studia_core::{Error, GenerationBackend, Result};

/// Mock generation backend for testing.
#[derive(Clone)]
pub struct MockGenerationBackend {
    config: Arc<MockConfig>,
    script: Arc<Mutex<VecDeque<Result<String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    /// Substring-of-prompt to response, first match wins.
    mappings: Vec<(String, String)>,
    default_response: String,
    latency_ms: u64,
    failure_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            default_response: "{}".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
        }
    }
}

impl MockGenerationBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the response returned when nothing else matches.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Answer prompts containing `needle` with `response`. Mappings are
    /// checked in registration order.
    pub fn with_response_mapping(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .mappings
            .push((needle.into(), response.into()));
        self
    }

    /// Queue scripted outcomes consumed before any mapping lookup.
    pub fn with_script(self, outcomes: Vec<Result<String>>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    /// Queue `count` transient-looking failures ahead of other responses.
    pub fn with_leading_failures(self, count: usize) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            for _ in 0..count {
                script.push_back(Err(Error::Generation(
                    "mock backend: connection reset".to_string(),
                )));
            }
        }
        self
    }

    /// Set simulated latency for all calls.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set random failure rate (0.0 - 1.0) for resilience testing.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// All prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of generation calls made.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }

        if self.config.failure_rate > 0.0 && rand::random::<f64>() < self.config.failure_rate {
            return Err(Error::Generation("mock backend failure".to_string()));
        }

        for (needle, response) in &self.config.mappings {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }

        Ok(self.config.default_response.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
