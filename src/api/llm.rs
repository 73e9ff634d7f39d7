// Chat completion client for the recommender.
// Talks to Azure OpenAI when an endpoint is configured, otherwise to the
// OpenAI API directly. Both speak the same chat-completions wire format.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::features::context::build_context_prompt;
use crate::models::{ConversationMessage, Role, UserProfile};
use crate::utils::config::Config;

/// Personality and ground rules sent as the leading system message.
const SYSTEM_PROMPT: &str = "\
You are Ludens, a personal AI game companion. You know the user's game \
library across Steam, PlayStation and Xbox, including playtime, \
achievements, trophies and their wishlist.

Your job:
- Recommend what to play next from games they already own, especially \
  unplayed or barely played ones.
- Help them pick achievements and trophies worth chasing, and celebrate \
  rare unlocks.
- Point out wishlist games that are on sale when relevant.
- Answer questions about their library and play habits.

Style:
- Be warm and concise. A few sentences is usually enough.
- Ground every recommendation in the library data you are given. Never \
  invent games, playtimes or achievements that are not in the data.
- If the library is empty, suggest running a sync first.";

/// How many prior messages are replayed to the model per request.
const HISTORY_WINDOW: usize = 20;

const MAX_RESPONSE_TOKENS: u32 = 500;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(
        "No language model configured. Set OPENAI_API_KEY, or \
         AZURE_OPENAI_API_KEY plus AZURE_OPENAI_ENDPOINT, in your .env"
    )]
    MissingApiKey,
    #[error("chat completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat completion API error: {0}")]
    Api(String),
    #[error("the model returned an empty response")]
    EmptyResponse,
}

enum Backend {
    /// Azure deployment URL with the api-key header.
    Azure { url: String },
    /// Plain OpenAI with a bearer token and explicit model name.
    OpenAi { model: String },
}

/// Conversational recommender backed by a chat completion API.
pub struct Recommender {
    http: reqwest::Client,
    api_key: String,
    backend: Backend,
}

impl Recommender {
    /// Pick the backend from configuration, preferring Azure when both are
    /// configured.
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self, LlmError> {
        if let (Some(key), Some(endpoint)) =
            (&config.azure_openai_api_key, &config.azure_openai_endpoint)
        {
            let url = format!(
                "{}/openai/deployments/{}/chat/completions?api-version=2024-02-15-preview",
                endpoint.trim_end_matches('/'),
                config.azure_openai_deployment
            );
            return Ok(Self {
                http,
                api_key: key.clone(),
                backend: Backend::Azure { url },
            });
        }
        if let Some(key) = &config.openai_api_key {
            return Ok(Self {
                http,
                api_key: key.clone(),
                backend: Backend::OpenAi {
                    model: config.openai_model.clone(),
                },
            });
        }
        Err(LlmError::MissingApiKey)
    }

    /// Answer a user message with the library digest and recent conversation
    /// history as context.
    pub async fn chat(
        &self,
        user_message: &str,
        profile: &UserProfile,
        history: &[ConversationMessage],
    ) -> Result<String, LlmError> {
        let mut messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "system".to_string(),
                content: build_context_prompt(profile),
            },
        ];

        let window_start = history.len().saturating_sub(HISTORY_WINDOW);
        for msg in &history[window_start..] {
            messages.push(ChatMessage {
                role: match msg.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_message.to_string(),
        });

        self.complete(messages, MAX_RESPONSE_TOKENS).await
    }

    /// Generate a short title for a conversation from its first exchange.
    pub async fn generate_title(
        &self,
        history: &[ConversationMessage],
    ) -> Result<String, LlmError> {
        let mut transcript = String::new();
        for msg in history.iter().take(4) {
            let speaker = match msg.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            transcript.push_str(&format!("{speaker}: {}\n", msg.content));
        }

        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: "Write a title of at most five words for the conversation \
                          below. Reply with the title only, no quotes."
                    .to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: transcript,
            },
        ];

        let title = self.complete(messages, 20).await?;
        let title = title.trim().trim_matches('"').trim_matches('\'').trim();
        if title.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(crate::utils::formatters::truncate(title, 60))
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let mut body = json!({
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": 0.7,
        });

        let request = match &self.backend {
            Backend::Azure { url } => self.http.post(url).header("api-key", &self.api_key),
            Backend::OpenAi { model } => {
                body["model"] = json!(model);
                self.http
                    .post("https://api.openai.com/v1/chat/completions")
                    .bearer_auth(&self.api_key)
            }
        };

        let response = request.json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{status}: {text}")));
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_azure_preferred_over_openai() {
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            azure_openai_api_key: Some("azure-key".to_string()),
            azure_openai_endpoint: Some("https://example.openai.azure.com/".to_string()),
            azure_openai_deployment: "gpt-4o-mini".to_string(),
            ..Config::default()
        };
        let recommender = Recommender::new(reqwest::Client::new(), &config).unwrap();
        match recommender.backend {
            Backend::Azure { url } => {
                assert!(url.starts_with(
                    "https://example.openai.azure.com/openai/deployments/gpt-4o-mini"
                ));
            }
            Backend::OpenAi { .. } => panic!("expected Azure backend"),
        }
    }

    #[test]
    fn test_openai_fallback_uses_its_own_model() {
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            openai_model: "gpt-4o".to_string(),
            // An Azure deployment name alone must not leak into the model.
            azure_openai_deployment: "my-azure-deployment".to_string(),
            ..Config::default()
        };
        let recommender = Recommender::new(reqwest::Client::new(), &config).unwrap();
        match recommender.backend {
            Backend::OpenAi { model } => assert_eq!(model, "gpt-4o"),
            Backend::Azure { .. } => panic!("expected OpenAI backend"),
        }
    }

    #[test]
    fn test_unconfigured_fails() {
        let config = Config::default();
        assert!(Recommender::new(reqwest::Client::new(), &config).is_err());
    }
}
