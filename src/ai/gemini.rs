use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use super::AiService;
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiService {
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    client: Client,
}

impl GeminiService {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: config.api_key.trim().to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            client,
        })
    }

    /// `generateContent` URL. The API key travels in a header, never here.
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, prompt: &str, image_base64: &str, mime_type: &str) -> Value {
        let mut generation_config = serde_json::Map::new();
        if let Some(tokens) = self.max_output_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(tokens));
        }
        if let Some(temperature) = self.temperature {
            generation_config.insert("temperature".into(), json!(temperature));
        }

        let mut body = json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt },
                        {
                            "inline_data": {
                                "mime_type": mime_type,
                                "data": image_base64
                            }
                        }
                    ]
                }
            ]
        });
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }
        body
    }
}

#[async_trait::async_trait]
impl AiService for GeminiService {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str, image_base64: &str, mime_type: &str) -> Result<String> {
        log::debug!(
            "Gemini request: model={} mime_type={} payload={} bytes",
            self.model,
            mime_type,
            image_base64.len()
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&self.request_body(prompt, image_base64, mime_type))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Gemini request failed")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read Gemini response")?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        let json: Value =
            serde_json::from_str(&text).context("Failed to parse Gemini response JSON")?;

        extract_text(&json)
    }
}

/// Pull the generated text out of a `generateContent` response.
///
/// Concatenates the text parts of the first candidate. A blocked prompt or a
/// candidate without text is an error.
pub fn extract_text(response: &Value) -> Result<String> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        anyhow::bail!("Gemini blocked the request: {reason}");
    }

    let candidate = &response["candidates"][0];
    let parts = candidate["content"]["parts"]
        .as_array()
        .with_context(|| match candidate["finishReason"].as_str() {
            Some(reason) => format!("No content in Gemini response (finish reason: {reason})"),
            None => "No content in Gemini response".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.trim().is_empty() {
        anyhow::bail!("Gemini response contained no text");
    }

    log::debug!("Raw Gemini response:\n{text}");
    Ok(text)
}
