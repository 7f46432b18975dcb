//! HTTP chat transport for OpenAI-compatible providers.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{is_moderation_code, ChatApi};
use crate::config::OpenAiSettings;
use crate::types::Message;
use crate::{Error, Result};

pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpChatApi {
    pub fn new(settings: &OpenAiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Pull the provider error code out of an error body, tolerating both
    /// `{"error": {"code": ...}}` and flat shapes.
    fn error_code(body: &str) -> Option<String> {
        let json: serde_json::Value = serde_json::from_str(body).ok()?;
        json.get("error")
            .and_then(|e| e.get("code"))
            .or_else(|| json.get("code"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        let raw = headers.get("retry-after")?.to_str().ok()?;
        raw.trim().parse::<u64>().ok().map(Duration::from_secs)
    }

    /// Map a non-success response to the error taxonomy.
    pub(crate) fn classify_failure(
        status: u16,
        headers: &reqwest::header::HeaderMap,
        body: String,
    ) -> Error {
        if let Some(code) = Self::error_code(&body) {
            if is_moderation_code(&code) {
                return Error::Moderation { message: body };
            }
        }
        match Error::from_status(status, body) {
            Error::RateLimited { message, .. } => Error::RateLimited {
                message,
                retry_after: Self::retry_after(headers),
            },
            other => other,
        }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        let request_id = Uuid::new_v4().to_string();
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        let start = std::time::Instant::now();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("x-request-id", &request_id)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let headers = resp.headers().clone();
            let text = resp.text().await.unwrap_or_default();
            let err = Self::classify_failure(status, &headers, text);
            info!(
                http_status = status,
                error_kind = err.kind().as_str(),
                request_id = request_id.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "chat request failed"
            );
            return Err(err);
        }

        let json: serde_json::Value = resp.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                Error::Api {
                    status,
                    message: "response missing choices[0].message.content".to_string(),
                }
            })?
            .to_string();

        info!(
            http_status = status,
            request_id = request_id.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            "chat request completed"
        );
        Ok(content)
    }
}
