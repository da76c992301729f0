//! Summaries through an OpenAI-compatible chat completions API.

use super::{truncate_input, Summarizer, Summary};
use crate::config::{Prompts, SummarySettings};
use crate::error::{RcbotError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Chat-completions summarizer.
pub struct OpenAISummarizer {
    client: Client<OpenAIConfig>,
    model: String,
    max_chars: usize,
    temperature: f32,
    prompts: Prompts,
}

impl OpenAISummarizer {
    /// Build a summarizer, or `None` when no API key is configured.
    pub fn from_settings(settings: &SummarySettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key() else {
            return Ok(None);
        };
        let client = create_client(
            api_key,
            &settings.api_base,
            Duration::from_secs(settings.timeout_seconds),
        )?;

        Ok(Some(Self {
            client,
            model: settings.model.clone(),
            max_chars: settings.max_chars.max(1),
            temperature: settings.temperature,
            prompts: Prompts::default(),
        }))
    }

    /// Use custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for OpenAISummarizer {
    #[instrument(skip(self, transcript), fields(model = %self.model, chars = transcript.len()))]
    async fn summarize(&self, transcript: &str) -> Result<Option<Summary>> {
        let (input, truncated) = truncate_input(transcript, self.max_chars);
        let input_chars = input.chars().count();
        if truncated {
            info!("Transcript truncated to {} characters for summary", input_chars);
        }

        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), input.to_string());
        let user_prompt = Prompts::render(&self.prompts.summary.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.summary.system.clone())
                .build()
                .map_err(|e| RcbotError::CapabilityFailed(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| RcbotError::CapabilityFailed(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| RcbotError::CapabilityFailed(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            RcbotError::CapabilityFailed(format!("Failed to generate summary: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            debug!("Empty summary returned");
            return Ok(None);
        }

        Ok(Some(Summary {
            content: content.to_string(),
            model: self.model.clone(),
            truncated,
            input_chars,
        }))
    }
}
