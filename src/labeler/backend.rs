use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::VlmConfig;

/// A vision-language model that answers a text prompt about one image.
pub trait VlmBackend: Send + Sync {
    fn model_id(&self) -> &str;

    fn device(&self) -> &str;

    /// Sends `prompt` with the PNG-encoded, base64 image and returns the raw
    /// text answer.
    fn complete(&self, prompt: &str, image_png_base64: &str) -> Result<String>;
}

/// Backend for an OpenAI-compatible chat completions endpoint.
pub struct HttpVlmBackend {
    agent: ureq::Agent,
    endpoint: String,
    model_id: String,
    device: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl std::fmt::Debug for HttpVlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVlmBackend")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("device", &self.device)
            .field("authorized", &self.api_key.is_some())
            .finish()
    }
}

impl HttpVlmBackend {
    pub fn new(config: &VlmConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            anyhow::bail!("vlm.endpoint is empty");
        }
        let api_key = match &config.api_key_env {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("API key variable {var} is not set"))?,
            ),
            None => None,
        };

        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            agent: ureq::Agent::new_with_config(agent_config),
            endpoint: config.endpoint.clone(),
            model_id: config.model_id.clone(),
            device: config.device.clone(),
            api_key,
            max_tokens: config.max_tokens,
        })
    }

    /// Builds the backend and checks that the server answers.
    pub fn connect(config: &VlmConfig) -> Result<Self> {
        let backend = Self::new(config)?;
        backend.check_available()?;
        Ok(backend)
    }

    /// URL probed by [`HttpVlmBackend::check_available`]: the `/models` route
    /// next to a chat completions endpoint, or the endpoint itself.
    pub fn health_url(&self) -> String {
        match self.endpoint.strip_suffix("/chat/completions") {
            Some(base) => format!("{base}/models"),
            None => self.endpoint.clone(),
        }
    }

    /// Fails when the server cannot be reached within the configured timeout.
    ///
    /// Any HTTP status counts as reachable; only transport errors fail.
    pub fn check_available(&self) -> Result<()> {
        let url = self.health_url();
        let mut request = self.agent.get(url.as_str());
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        match request.call() {
            Ok(_) | Err(ureq::Error::StatusCode(_)) => {
                log::debug!("Vision model server reachable at {url}");
                Ok(())
            }
            Err(err) => Err(anyhow::Error::new(err).context(format!("GET {url}"))),
        }
    }

    fn request_body(&self, prompt: &str, image_png_base64: &str) -> Value {
        json!({
            "model": self.model_id,
            "temperature": 0,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{image_png_base64}") }
                    }
                ]
            }]
        })
    }
}

/// Text of the first choice in a chat completions response.
pub(crate) fn completion_text(response: &Value) -> Option<&str> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
}

impl VlmBackend for HttpVlmBackend {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device(&self) -> &str {
        &self.device
    }

    fn complete(&self, prompt: &str, image_png_base64: &str) -> Result<String> {
        let payload = serde_json::to_vec(&self.request_body(prompt, image_png_base64))?;

        let mut request = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let mut response = request
            .send(&payload[..])
            .with_context(|| format!("POST {}", self.endpoint))?;
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read completion response")?;
        let value: Value = serde_json::from_str(&text).context("Completion response is not JSON")?;

        completion_text(&value)
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("Completion response has no choices[0].message.content"))
    }
}
