use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Result, TriageError};
use super::issue::{FixSuggestion, Issue};

/// The opaque fix-suggestion collaborator. Implementations may be slow and
/// may fail; their output is untrusted and is never applied without the
/// caller's explicit review.
#[async_trait]
pub trait FixSuggester: Send + Sync {
    /// Propose a fix for one issue given the file's current content
    async fn suggest(&self, issue: &Issue, file_content: &str) -> Result<FixSuggestion>;

    /// Human-readable provider name
    fn provider_name(&self) -> &str;
}

/// Factory function to create the configured suggester
pub fn create_suggester(config: &LlmConfig) -> Result<Box<dyn FixSuggester>> {
    if !config.enabled {
        return Err(TriageError::Config(
            "fix suggestions are disabled".to_string(),
        ));
    }

    match config.provider.as_str() {
        "openai" | "custom" => Ok(Box::new(HttpSuggester::new(config)?)),
        _ => Err(TriageError::Config(format!(
            "Unsupported suggestion provider: {}",
            config.provider
        ))),
    }
}

/// Chat-completions-backed suggester. Works against the OpenAI API or any
/// endpoint speaking the same shape via `base_url`.
pub struct HttpSuggester {
    config: LlmConfig,
    client: reqwest::Client,
}

impl HttpSuggester {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_none() && config.base_url.is_none() {
            return Err(TriageError::Config(
                "API key or base URL required for the suggestion provider".to_string(),
            ));
        }

        Ok(Self {
            config: config.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn endpoint(&self) -> String {
        match self.config.base_url.as_deref() {
            Some(base) => format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            None => "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    fn build_prompt(&self, issue: &Issue, file_content: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "A static-analysis run flagged the following issue in {}:\n\n",
            issue.relative_path
        ));
        prompt.push_str(&format!(
            "Line {}, column {}: {} ({:?}, {})\n",
            issue.line,
            issue.column,
            issue.message,
            issue.severity,
            issue.rule.as_deref().unwrap_or("no rule id")
        ));

        if !issue.code_snippet.is_empty() {
            prompt.push_str("\nSurrounding code:\n");
            prompt.push_str(&issue.code_snippet);
            prompt.push_str("\n");
        }

        prompt.push_str("\nFull file content:\n");
        prompt.push_str(file_content);

        prompt.push_str(
            "\n\nPropose a minimal fix. Respond with a JSON object containing exactly \
             these fields: \"original_code\" (the lines to replace, verbatim), \
             \"fixed_code\" (the replacement), \"explanation\" (one or two sentences), \
             and \"confidence\" (integer 0-100).",
        );

        prompt
    }

    fn parse_suggestion(content: &str) -> Result<FixSuggestion> {
        // Some models wrap JSON in a code fence
        let stripped = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        serde_json::from_str::<FixSuggestion>(stripped).map_err(|e| {
            TriageError::Suggestion(format!("provider returned unparseable suggestion: {}", e))
        })
    }
}

#[async_trait]
impl FixSuggester for HttpSuggester {
    async fn suggest(&self, issue: &Issue, file_content: &str) -> Result<FixSuggestion> {
        let prompt = self.build_prompt(issue, file_content);

        let payload = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a careful code-repair assistant. You propose minimal, reviewable fixes and never invent changes beyond the reported issue."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": self.config.max_tokens.unwrap_or(2000),
            "temperature": self.config.temperature.unwrap_or(0.2)
        });

        let mut request = self.client.post(self.endpoint()).json(&payload);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TriageError::Suggestion(format!("suggestion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TriageError::Suggestion(format!(
                "provider error {}: {}",
                status, error_text
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TriageError::Suggestion(format!("unparseable provider response: {}", e)))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                TriageError::Suggestion("provider response missing content".to_string())
            })?;

        debug!("Suggestion provider returned {} bytes", content.len());

        Self::parse_suggestion(content)
    }

    fn provider_name(&self) -> &str {
        match self.config.provider.as_str() {
            "openai" => "OpenAI",
            _ => "Custom endpoint",
        }
    }
}
