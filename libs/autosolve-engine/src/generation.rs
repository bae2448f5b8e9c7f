//! Generation client: asks the chat-completions service for a program.
//!
//! This is the only place that interprets HTTP status codes from the
//! generation service. The retry loop is a plain counter:
//!
//! - 200 with usable code: done, no further attempts
//! - 200 with empty code or an `input(` call: next attempt, no sleep
//! - 429: sleep for `Retry-After` (default 1s, capped), next attempt
//! - anything else, or a transport error: fail immediately

use crate::error::{SolveError, SolveResult};
use crate::prompt::{augment_question, build_prompt, contains_interactive_input, strip_code_fences};
use anyhow::Context;
use async_trait::async_trait;
use autosolve_common::config::GenerationConfig;
use autosolve_common::types::GenerationResult;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const EXHAUSTED_MESSAGE: &str = "Error: Unable to fetch solution from the API after multiple attempts.";

/// Longest service error body kept in a failure message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Source of candidate programs for a question
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> GenerationResult;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: ChatResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Result of one `generate` call together with the attempts it used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub result: GenerationResult,
    pub attempts: u32,
}

/// HTTP client for the generation service.
///
/// Holds the credential and retry policy; keeps no state between calls.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client for generation service")?;

        if config.api_key.is_none() {
            warn!("API_KEY is not set; generation requests will be sent without credentials");
        }

        Ok(Self { client, config })
    }

    /// Run the retry loop for one question
    pub async fn generate_detailed(&self, question: &str) -> GenerationOutcome {
        let prompt = {
            let mut rng = rand::thread_rng();
            build_prompt(&augment_question(question, &mut rng), &self.config.language)
        };
        debug!(prompt = %prompt, "Built generation prompt");

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            let start = Instant::now();

            match self.attempt(&prompt).await {
                Ok(code) => {
                    info!(
                        attempt = attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        code_size = code.len(),
                        "Generated solution"
                    );
                    debug!(code = %code, "Generated code");
                    return GenerationOutcome {
                        result: GenerationResult::Success(code),
                        attempts,
                    };
                }
                Err(e) if !e.is_retryable() => {
                    error!(attempt = attempts, error = %e, "Generation request failed");
                    return GenerationOutcome {
                        result: GenerationResult::failure(e.to_string()),
                        attempts,
                    };
                }
                Err(SolveError::RateLimited { retry_after }) => {
                    if attempts == max_attempts {
                        warn!(attempt = attempts, "Rate limit hit on final attempt");
                        break;
                    }
                    warn!(
                        attempt = attempts,
                        retry_after_secs = retry_after.as_secs(),
                        "Rate limit hit. Backing off"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                Err(e) => {
                    warn!(attempt = attempts, reason = %e, "Generated code rejected. Retrying...");
                }
            }
        }

        error!(attempts = attempts, "Generation attempts exhausted");
        GenerationOutcome {
            result: GenerationResult::failure(EXHAUSTED_MESSAGE),
            attempts,
        }
    }

    /// One request; returns cleaned code or the classified failure
    async fn attempt(&self, prompt: &str) -> SolveResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
        };

        let mut request = self.client.post(&self.config.base_url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200 => {
                let payload: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| SolveError::Transport(format!("malformed response body: {}", e)))?;

                let content = payload
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .unwrap_or_default();

                let code = strip_code_fences(&content);
                if code.is_empty() {
                    return Err(SolveError::GenerationInvalid("response contained no code".to_string()));
                }
                if contains_interactive_input(&code) {
                    return Err(SolveError::GenerationInvalid(
                        "generated code still contains 'input()'".to_string(),
                    ));
                }
                Ok(code)
            }

            429 => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(self.config.default_retry_after_secs)
                    .min(self.config.max_retry_after_secs);

                Err(SolveError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                })
            }

            code => {
                let text = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(SolveError::Service {
                    status: code,
                    body: text.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
                })
            }
        }
    }
}

#[async_trait]
impl CodeGenerator for GenerationClient {
    async fn generate(&self, question: &str) -> GenerationResult {
        self.generate_detailed(question).await.result
    }
}
