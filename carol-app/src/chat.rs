//! Chat completion backend used by the wish tool.
//!
//! The `ChatModel` trait keeps the session loop testable without network
//! access; `ChatClient` is the real OpenAI-compatible implementation
//! covering both hosts.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// API version sent with Azure OpenAI chat completion requests.
const AZURE_API_VERSION: &str = "2024-10-21";

/// Contract for single-turn chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a single-turn completion and return the assistant text.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Where the chat completion endpoint lives and how it authenticates.
#[derive(Debug, Clone)]
enum ChatHost {
    OpenAi,
    Azure { endpoint: String },
}

/// OpenAI-compatible chat completion client.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    host: ChatHost,
}

impl ChatClient {
    /// Client for the OpenAI host.
    pub fn openai(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            host: ChatHost::OpenAi,
        }
    }

    /// Client for an Azure OpenAI resource; `deployment` is the chat model
    /// deployment name.
    pub fn azure(endpoint: String, api_key: String, deployment: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: deployment,
            host: ChatHost::Azure { endpoint },
        }
    }

    fn request_url(&self) -> String {
        match &self.host {
            ChatHost::OpenAi => "https://api.openai.com/v1/chat/completions".to_string(),
            ChatHost::Azure { endpoint } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={AZURE_API_VERSION}",
                endpoint.trim_end_matches('/'),
                self.model
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
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
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending chat completion request");

        let request = self.client.post(self.request_url()).json(&body);
        let request = match &self.host {
            ChatHost::OpenAi => request.bearer_auth(&self.api_key),
            ChatHost::Azure { .. } => request.header("api-key", &self.api_key),
        };

        let response = request
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            bail!("chat API error {status}: {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("parsing chat completion response")?;
        extract_text(parsed)
    }
}

fn extract_text(response: ChatResponse) -> anyhow::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| anyhow::anyhow!("chat completion returned no content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_url_is_the_public_endpoint() {
        let client = ChatClient::openai("sk-test".into(), "gpt-4o-mini".into());
        assert_eq!(
            client.request_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn azure_url_includes_deployment_and_api_version() {
        let client = ChatClient::azure(
            "https://example.openai.azure.com/".into(),
            "key".into(),
            "my-gpt4o".into(),
        );
        assert_eq!(
            client.request_url(),
            format!(
                "https://example.openai.azure.com/openai/deployments/my-gpt4o/chat/completions?api-version={AZURE_API_VERSION}"
            )
        );
    }

    #[test]
    fn request_body_has_a_single_user_message() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn extract_text_returns_the_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "Ho ho ho!"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Ho ho ho!");
    }

    #[test]
    fn empty_choices_are_an_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(extract_text(response).is_err());
    }

    #[test]
    fn null_content_is_an_error() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(extract_text(response).is_err());
    }
}
