use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_error_body, CompletionError, CompletionService};

const SYSTEM_PROMPT: &str =
    "You answer questions about trailer parts using only the product listings in the prompt.";

/// OpenAI-compatible chat completions provider.
pub struct OpenAiCompletion {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiCompletion {
    /// Builds a provider against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        if api_key.trim().is_empty() {
            return Err(CompletionError::Config("missing OpenAI API key".into()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| CompletionError::Config("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| CompletionError::Config(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            temperature,
            max_tokens,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::Transport)?;
        if !resp.status().is_success() {
            return Err(read_error_body(resp).await);
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|err| CompletionError::InvalidResponse(err.to_string()))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("no choices returned".into()))?;
        Ok(answer.trim().to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}
