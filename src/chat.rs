use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::transcript::{Message, Role};

/// What actually goes on the wire: role and content only. Timestamps never
/// leave the client.
#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<WireMessage<'a>>,
}

impl<'a> ChatRequest<'a> {
    fn new(history: &'a [Message]) -> Self {
        Self {
            messages: history
                .iter()
                .map(|message| WireMessage {
                    role: message.role,
                    content: &message.content,
                })
                .collect(),
        }
    }
}

/// HTTP client for the mortgage assistant service.
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    base_url: String,
}

impl AssistantClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    /// Sends the accumulated history and returns the reply. The service
    /// answers with a plain text body; the whole body is the reply content.
    pub async fn ask(&self, history: &[Message]) -> Result<String> {
        let request = ChatRequest::new(history);

        debug!(messages = history.len(), "sending chat request");

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "assistant request failed with status: {}",
                response.status()
            ));
        }

        let reply = response.text().await?;
        debug!(bytes = reply.len(), "received chat reply");
        Ok(reply)
    }
}
