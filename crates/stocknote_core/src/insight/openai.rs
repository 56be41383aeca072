//! OpenAI-compatible chat-completions insight generator.
//!
//! Works with any endpoint exposing `POST {base_url}/chat/completions`
//! (OpenAI, Azure OpenAI, vLLM, Ollama). Uses the blocking HTTP client so
//! callers stay synchronous.

use super::prompt::{build_analysis_prompt, SYSTEM_PROMPT};
use super::{InsightError, InsightGenerator, InsightSettings, StockInsight};
use crate::market::MetricsSnapshot;
use crate::model::item::ResearchItem;
use log::{error, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Live generator backed by a chat-completions API.
pub struct OpenAiInsightGenerator {
    client: Client,
    api_key: String,
    settings: InsightSettings,
}

impl OpenAiInsightGenerator {
    /// Creates a generator for `api_key`.
    ///
    /// # Errors
    /// - `Http` when the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>, settings: InsightSettings) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(InsightError::Http)?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    pub fn settings(&self) -> &InsightSettings {
        &self.settings
    }

    fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn complete(&self, prompt: String) -> Result<String, InsightError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(InsightError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InsightError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().map_err(InsightError::Http)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(InsightError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

impl InsightGenerator for OpenAiInsightGenerator {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn generate(
        &self,
        snapshot: &MetricsSnapshot,
        context: &[ResearchItem],
    ) -> Result<StockInsight, InsightError> {
        let started_at = Instant::now();
        let prompt = build_analysis_prompt(snapshot, context);

        match self.complete(prompt) {
            Ok(text) => {
                info!(
                    "event=insight_generate module=insight status=ok generator=openai ticker={} context_items={} duration_ms={}",
                    snapshot.ticker,
                    context.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(StockInsight::from_analysis(snapshot, text, self.name()))
            }
            Err(err) => {
                error!(
                    "event=insight_generate module=insight status=error generator=openai ticker={} duration_ms={} error={}",
                    snapshot.ticker,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_url_tolerates_trailing_slash() {
        let settings = InsightSettings {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..InsightSettings::default()
        };
        let generator = OpenAiInsightGenerator::new("key", settings).unwrap();
        assert_eq!(
            generator.chat_completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_matches_chat_completions_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            max_tokens: 800,
            temperature: 0.3,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 800);
    }

    #[test]
    fn response_without_content_is_tolerated_by_decoder() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
