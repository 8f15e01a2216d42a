use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::llm::prompt::{build_ranking_prompt, SYSTEM_PROMPT};
use crate::llm::RankingClient;
use crate::models::{CandidatePost, RawModelReply, TokenUsage};

/// Ranking client speaking the Ollama or OpenAI-compatible chat API.
#[derive(Clone)]
pub struct HttpRankingClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpRankingClient {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.clamp(1, 120))
    }
}

#[async_trait]
impl RankingClient for HttpRankingClient {
    async fn rank(
        &self,
        user_text: &str,
        profile_tags: Option<&str>,
        candidates: &[CandidatePost],
    ) -> Result<RawModelReply> {
        let prompt = build_ranking_prompt(user_text, profile_tags, candidates);
        tracing::debug!(
            "Ranking prompt: {} chars, {} candidates",
            prompt.len(),
            candidates.len()
        );

        match self.config.provider.as_str() {
            "ollama" => call_ollama(&self.client, &self.config, &prompt, self.timeout()).await,
            "openai" => call_openai(&self.client, &self.config, &prompt, self.timeout()).await,
            other => anyhow::bail!("Unknown LLM provider: {other}"),
        }
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

fn messages(prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        },
    ]
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
    timeout: Duration,
) -> Result<RawModelReply> {
    let url = format!("{}/api/chat", config.base_url.trim_end_matches('/'));

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: messages(prompt),
        stream: false,
        options: OllamaOptions {
            temperature: 0.2,
            num_predict: config.max_tokens,
        },
    };

    let resp = client
        .post(&url)
        .timeout(timeout)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API for ranking")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama chat response")?;

    Ok(RawModelReply {
        text: body.message.content,
        usage: TokenUsage {
            input_units: body.prompt_eval_count,
            output_units: body.eval_count,
        },
    })
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
    timeout: Duration,
) -> Result<RawModelReply> {
    let url = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: messages(prompt),
        temperature: 0.2,
        max_tokens: config.max_tokens,
    };

    let resp = client
        .post(&url)
        .timeout(timeout)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API for ranking")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI chat response")?;

    let text = body
        .choices
        .into_iter()
        .next()
        .context("OpenAI chat response contained no choices")?
        .message
        .content
        .unwrap_or_default();
    let usage = body
        .usage
        .map(|u| TokenUsage {
            input_units: u.prompt_tokens,
            output_units: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(RawModelReply { text, usage })
}
