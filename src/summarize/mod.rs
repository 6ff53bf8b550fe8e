//! Transcript summarization via an OpenAI chat completion.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Keep the prompt comfortably inside the context window of the cheaper
/// chat models.
const MAX_TRANSCRIPT_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates concise, informative summaries of transcripts.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// One text-completion call over the full transcript text. No retries, no
/// branching: either the API is available or it is not.
pub struct Summarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl Summarizer {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model,
        }
    }

    pub async fn summarize(&self, transcript_text: &str) -> Result<String> {
        let prompt = build_prompt(transcript_text);

        tracing::info!(model = %self.model, "requesting transcript summary");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            max_tokens: 500,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Summary request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Summary request rejected: HTTP {status}: {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Malformed summary response")?;

        let summary = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("Summary response contained no text")?;

        Ok(summary)
    }
}

fn build_prompt(transcript_text: &str) -> String {
    let text = if transcript_text.len() > MAX_TRANSCRIPT_CHARS {
        // Truncate on a char boundary, never mid-codepoint.
        let cut = (0..=MAX_TRANSCRIPT_CHARS)
            .rev()
            .find(|&i| transcript_text.is_char_boundary(i))
            .unwrap_or(0);
        format!("{}... [truncated]", &transcript_text[..cut])
    } else {
        transcript_text.to_string()
    };

    format!(
        "Please provide a concise summary of this transcript, highlighting the main points and key information:\n\n{text}\n\nSummary:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_transcripts_pass_through_untruncated() {
        let prompt = build_prompt("hello world");
        assert!(prompt.contains("hello world"));
        assert!(!prompt.contains("[truncated]"));
        assert!(prompt.ends_with("Summary:"));
    }

    #[test]
    fn long_transcripts_are_truncated() {
        let long = "word ".repeat(5_000);
        let prompt = build_prompt(&long);
        assert!(prompt.contains("[truncated]"));
        assert!(prompt.len() < long.len());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multibyte chars straddling the cut must not panic.
        let long = "é".repeat(MAX_TRANSCRIPT_CHARS);
        let prompt = build_prompt(&long);
        assert!(prompt.contains("[truncated]"));
    }

    #[test]
    fn chat_response_parses() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "  A summary.  "}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.trim(), "A summary.");
    }
}
