//! HTTP client for the text-generation API.
//!
//! The backend speaks the OpenAI chat-completions format on its `/openai`
//! route. The default endpoint (Pollinations.AI) needs no API key.

use crate::history::{History, Message};
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Client for one chat backend. Holds the model and temperature the
/// session is currently using; the conversation itself lives in the
/// session's [`History`].
pub struct ChatClient {
    base_url: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl ChatClient {
    /// Create a client for the given endpoint and model.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into(),
            model: model.into(),
            temperature,
            client,
        }
    }

    /// The model currently in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch to a different model for subsequent turns.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// The sampling temperature currently in use.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Set the sampling temperature, clamped to the backend's 0.0-3.0 range.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature.clamp(0.0, 3.0);
    }

    /// Send one chat turn and return the assistant's reply.
    ///
    /// The request carries the system prompt, the retained history, and
    /// the new user message. On success the user/assistant exchange is
    /// recorded into `history`; a failed turn records nothing.
    pub async fn chat(
        &self,
        history: &mut History,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(history.messages().iter().cloned());
        messages.push(Message::user(user_message));

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: false,
        };

        let url = format!("{}/openai", self.base_url);
        debug!(url = %url, model = %self.model, "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to the text-generation API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "API request failed with status {}: {}",
                status,
                body.trim()
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse API response")?;

        let reply = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Empty response from the API"))?;

        history.push(Message::user(user_message));
        history.push(Message::assistant(reply.clone()));

        Ok(reply)
    }
}

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_is_clamped() {
        let mut client = ChatClient::new("https://text.pollinations.ai", "openai", 1.0);
        client.set_temperature(5.0);
        assert_eq!(client.temperature(), 3.0);
        client.set_temperature(-1.0);
        assert_eq!(client.temperature(), 0.0);
        client.set_temperature(0.7);
        assert_eq!(client.temperature(), 0.7);
    }

    #[test]
    fn test_set_model() {
        let mut client = ChatClient::new("https://text.pollinations.ai", "openai", 1.0);
        client.set_model("mistral");
        assert_eq!(client.model(), "mistral");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
