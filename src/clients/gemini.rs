use anyhow::{anyhow, Result};
use async_trait::async_trait;
use isahc::{AsyncReadResponseExt, HttpClient, Request};
use serde::Serialize;
use serde_json::Value;

use crate::clients::TextModel;

const GENERATE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

pub struct GeminiTextModel {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiTextModel {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Ok(GeminiTextModel {
            client: HttpClient::new()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

/// Pull the first candidate's text out of a `generateContent` reply.
pub fn candidate_text(reply: &Value) -> Option<&str> {
    reply
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

#[async_trait]
impl TextModel for GeminiTextModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 300,
            },
        };
        let request = Request::post(format!(
            "{GENERATE_URL}/{}:generateContent?key={}",
            self.model, self.api_key
        ))
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&body)?)?;
        let mut response = self.client.send_async(request).await?;
        if !response.status().is_success() {
            return Err(anyhow!("text model returned {}", response.status()));
        }
        let reply: Value = response.json().await?;
        candidate_text(&reply)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Empty AI response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_candidate() {
        let reply = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"score\": 3}"}]}}]
        });
        assert_eq!(candidate_text(&reply), Some("{\"score\": 3}"));
        assert_eq!(candidate_text(&serde_json::json!({"candidates": []})), None);
    }
}
