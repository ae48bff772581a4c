use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::EnrichmentError;

const SERVICE: &str = "completion";

/// Chat-completion style text service.
pub trait Completion {
    async fn complete(&self, prompt: &str) -> Result<String, EnrichmentError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// Completion endpoint authenticated with an `api-key` header.
pub struct HttpCompletion {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpCompletion {
    pub fn new(client: Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

impl Completion for HttpCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, EnrichmentError> {
        let body = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| EnrichmentError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| EnrichmentError::Malformed {
                    service: SERVICE,
                    reason: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EnrichmentError::Malformed {
                service: SERVICE,
                reason: "no choices".into(),
            })
    }
}
