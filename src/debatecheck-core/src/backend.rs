//! Completion backends.
//!
//! A backend maps (system prompt, user prompt, token budget) to generated
//! text. The active backend is chosen explicitly at startup and handed to the
//! orchestrator as a capability object; it is never stashed in globals or
//! inferred from the shape of a handle.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::{DebateError, Result};

/// A text-generation service.
///
/// `generate_batch` must preserve input order and return exactly one
/// completion per prompt pair; the default implementation degrades to
/// sequential single calls, which backends with a cheaper batched path
/// override (and advertise via `supports_batch`).
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String>;

    async fn generate_batch(
        &self,
        system_prompts: &[String],
        user_prompts: &[String],
        max_tokens: u32,
    ) -> Result<Vec<String>> {
        if system_prompts.len() != user_prompts.len() {
            return Err(DebateError::BatchShape {
                expected: system_prompts.len(),
                got: user_prompts.len(),
            });
        }
        let mut outputs = Vec::with_capacity(user_prompts.len());
        for (system, user) in system_prompts.iter().zip(user_prompts) {
            outputs.push(self.generate(system, user, max_tokens).await?);
        }
        Ok(outputs)
    }

    /// Whether the batch scheduler should prefer the batched call path.
    fn supports_batch(&self) -> bool {
        false
    }
}

/// Backend for any OpenAI-compatible chat-completions endpoint, remote or a
/// local server (vLLM, Ollama) exposed through the same API.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DebateError::Config(format!("failed to create HTTP client: {e}")))?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(api_base.into());

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(max_tokens)
            .messages(vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: system_prompt.to_string().into(),
                    name: None,
                }),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: user_prompt.to_string().into(),
                    name: None,
                }),
            ])
            .build()?;

        // Retry transient failures with exponential backoff: 1s, 2s, 4s.
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << attempt);
                tracing::debug!(attempt, model = %self.model, "retrying completion after backoff");
                tokio::time::sleep(delay).await;
            }

            match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default();
                    return Ok(sanitize_response(&content));
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(DebateError::from).unwrap_or_else(|| {
            DebateError::Backend("unknown API error after retries".to_string())
        }))
    }

    /// Batched mode: concurrent dispatch of independent single calls,
    /// order-preserving.
    async fn generate_batch(
        &self,
        system_prompts: &[String],
        user_prompts: &[String],
        max_tokens: u32,
    ) -> Result<Vec<String>> {
        if system_prompts.len() != user_prompts.len() {
            return Err(DebateError::BatchShape {
                expected: system_prompts.len(),
                got: user_prompts.len(),
            });
        }
        try_join_all(
            system_prompts
                .iter()
                .zip(user_prompts)
                .map(|(system, user)| self.generate(system, user, max_tokens)),
        )
        .await
    }

    fn supports_batch(&self) -> bool {
        true
    }
}

/// Strip reasoning blocks and leftover XML-like tags from model output.
///
/// Removes patterns like `<thinking>...</thinking>` that reasoning-tuned
/// models emit before their answer. Markdown and whitespace are left alone;
/// the verdict extractor depends on `**VERDICT**` markers surviving.
pub fn sanitize_response(response: &str) -> String {
    let tags_to_strip = [
        "thinking",
        "think",
        "reflection",
        "reflect",
        "internal",
        "reasoning",
        "thought",
        "scratch",
        "scratchpad",
        "analysis",
        "deliberation",
    ];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>");
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Remove any remaining orphaned opening/closing tags.
    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    result.trim().to_string()
}
