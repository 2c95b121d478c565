//! Chat-completions API client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GeneratorError;
use crate::prompt::{
    self, EmailDraft, EmailDraftRequest, LinkedInDraftRequest,
};

/// Sampling temperature for outreach copy; a bit of variety is wanted.
const TEMPERATURE: f32 = 0.8;

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// `product_context` is the one-line description of whatever is being
/// sold; it is woven into every prompt so generated copy stays on
/// message.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    product_context: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Create a client against `base_url` (e.g. `https://api.openai.com/v1`).
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        product_context: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            product_context: product_context.into(),
        }
    }

    /// One completion round-trip; returns the trimmed assistant text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// empty completion.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "Requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: [
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: TEMPERATURE,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(GeneratorError::Empty);
        }
        Ok(content.to_string())
    }

    /// Draft one cold email for a lead.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion round-trip fails; formatting
    /// problems in the completion itself are salvaged, not errored.
    pub async fn sales_email(
        &self,
        request: &EmailDraftRequest,
    ) -> Result<EmailDraft, GeneratorError> {
        let system = prompt::email_system_prompt(&self.product_context, request.language);
        let user = prompt::email_user_prompt(&self.product_context, request);
        let raw = self.complete(&system, &user).await?;
        Ok(prompt::salvage_email(&raw))
    }

    /// Draft a batch of LinkedIn posts or DMs.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion round-trip fails.
    pub async fn linkedin_items(
        &self,
        request: &LinkedInDraftRequest,
    ) -> Result<Vec<String>, GeneratorError> {
        let system = prompt::linkedin_system_prompt(&self.product_context);
        let user = prompt::linkedin_user_prompt(&self.product_context, request);
        let raw = self.complete(&system, &user).await?;
        Ok(prompt::salvage_items(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slashes() {
        let client = ChatClient::new("https://api.example.com/v1///", "key", "model", "Acme");
        assert_eq!(client.base_url, "https://api.example.com/v1");
    }
}
