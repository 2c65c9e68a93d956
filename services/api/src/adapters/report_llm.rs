//! services/api/src/adapters/report_llm.rs
//!
//! This module contains the adapter for the report-synthesis LLM.
//! It implements the `ReportSynthesisService` port from the `core` crate.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

use goodhands_core::ports::{
    PortError, PortResult, ReportSynthesis, ReportSynthesisInput, ReportSynthesisService,
    TrendAnalysis, TrendAnalysisInput,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ReportSynthesisService` using an OpenAI-compatible LLM.
///
/// Each call gets a per-attempt timeout and a bounded number of retries with
/// linear backoff; exhaustion surfaces as `PortError::Upstream`, never as a hang.
#[derive(Clone)]
pub struct OpenAiReportAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl OpenAiReportAdapter {
    /// Creates a new `OpenAiReportAdapter`.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            client,
            model,
            timeout,
            max_retries,
        }
    }

    /// Runs one chat completion and parses the reply as JSON of type `T`.
    async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> PortResult<T> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let chat = self.client.chat();
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(retry_delay(attempt)).await;
            }
            match tokio::time::timeout(self.timeout, chat.create(request.clone())).await {
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.timeout);
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                }
                Ok(Ok(response)) => {
                    let content = response
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.message.content)
                        .ok_or_else(|| {
                            PortError::Upstream(
                                "synthesis response contained no text content".to_string(),
                            )
                        })?;
                    // A malformed reply is retried like a transport failure.
                    match serde_json::from_str::<T>(extract_json(&content)) {
                        Ok(parsed) => return Ok(parsed),
                        Err(e) => {
                            last_error = format!("reply was not valid JSON: {e}");
                        }
                    }
                }
            }
            warn!(
                "synthesis attempt {}/{} failed: {}",
                attempt + 1,
                self.max_retries + 1,
                last_error
            );
        }
        Err(PortError::Upstream(format!(
            "report synthesis failed after {} attempts: {last_error}",
            self.max_retries + 1
        )))
    }
}

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Linear backoff: the nth retry waits n times the base delay.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BACKOFF * attempt
}

/// Strips a markdown code fence if the model wrapped its JSON in one.
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"));
    inner.map(str::trim).unwrap_or(trimmed)
}

//=========================================================================================
// `ReportSynthesisService` Trait Implementation
//=========================================================================================

const REPORT_SYSTEM_PROMPT: &str = "You are a care report writer for a home-care service. \
You receive one day's checklist answers and free-text care notes for a senior, and you write \
a warm, factual daily report addressed to the senior's family. \
Respond ONLY with a JSON object with these exact fields: \
\"keywords\" (array of 3-5 short strings), \
\"content\" (the report body, 3-5 paragraphs), \
\"ai_comment\" (one encouraging sentence for the family), \
\"ai_score\" (overall wellbeing for the day, a number from 1.0 to 5.0), \
\"special_notes\" (array of strings, may be empty, anything the family should watch). \
Do not invent facts that are not supported by the input.";

const TREND_SYSTEM_PROMPT: &str = "You are a care data analyst. You receive weekly average \
wellbeing scores (1-5 scale) for a senior and describe how they are trending. \
Respond ONLY with a JSON object with these exact fields: \
\"trend\" (one of \"improving\", \"stable\", \"declining\"), \
\"score_changes\" (array of week-over-week score deltas as numbers), \
\"insights\" (array of short observations), \
\"recommendations\" (array of short suggestions for the care team).";

#[async_trait]
impl ReportSynthesisService for OpenAiReportAdapter {
    async fn synthesize_report(&self, input: &ReportSynthesisInput) -> PortResult<ReportSynthesis> {
        let user_prompt = serde_json::to_string_pretty(input)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.complete_json(REPORT_SYSTEM_PROMPT, &user_prompt).await
    }

    async fn analyze_trend(&self, input: &TrendAnalysisInput) -> PortResult<TrendAnalysis> {
        let user_prompt = serde_json::to_string_pretty(input)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.complete_json(TREND_SYSTEM_PROMPT, &user_prompt).await
    }
}
