//! HTTP transport for the asynchronous text-to-image API.
//!
//! The provider contract is task-based: `create_task` submits a prompt and
//! returns an id, `poll_task` reports progress until a terminal state, and
//! `download` fetches the finished image bytes.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use super::{chat::HttpChatApi, is_moderation_code, ImageApi};
use crate::config::ImageApiSettings;
use crate::types::{TaskPoll, TaskStatus};
use crate::{Error, Result};

pub struct HttpImageApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpImageApi {
    pub fn new(settings: &ImageApiSettings) -> Result<Self> {
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

    fn parse_status(raw: &str) -> TaskStatus {
        match raw {
            "pending" | "queued" | "submitted" => TaskStatus::Pending,
            "processing" | "running" | "in_progress" => TaskStatus::Processing,
            "succeeded" | "success" | "completed" => TaskStatus::Succeeded,
            _ => TaskStatus::Failed,
        }
    }
}

#[async_trait]
impl ImageApi for HttpImageApi {
    async fn create_task(&self, prompt: &str, size: &str, model: &str) -> Result<String> {
        let request_id = Uuid::new_v4().to_string();
        let url = format!("{}/images/generations", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt,
            "size": size,
            "model": model,
            "async": true,
        });

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
            let err = HttpChatApi::classify_failure(status, &headers, text);
            info!(
                http_status = status,
                error_kind = err.kind().as_str(),
                request_id = request_id.as_str(),
                "image task submission failed"
            );
            return Err(err);
        }

        let json: serde_json::Value = resp.json().await?;
        let task_id = json["task_id"]
            .as_str()
            .or_else(|| json["id"].as_str())
            .ok_or_else(|| Error::Api {
                status,
                message: "response missing task_id".to_string(),
            })?
            .to_string();
        debug!(task_id = task_id.as_str(), "image task submitted");
        Ok(task_id)
    }

    async fn poll_task(&self, task_id: &str) -> Result<TaskPoll> {
        let url = format!("{}/images/tasks/{}", self.base_url, task_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let headers = resp.headers().clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(HttpChatApi::classify_failure(status, &headers, text));
        }

        let json: serde_json::Value = resp.json().await?;
        let task_status = Self::parse_status(json["status"].as_str().unwrap_or("failed"));

        // A terminal failure whose error code is a moderation code must keep
        // its kind, so the dispatcher can run its prompt-simplification retry.
        if task_status == TaskStatus::Failed {
            if let Some(code) = json["error"]["code"].as_str() {
                if is_moderation_code(code) {
                    return Err(Error::Moderation {
                        message: json["error"]["message"]
                            .as_str()
                            .unwrap_or("image content rejected")
                            .to_string(),
                    });
                }
            }
        }

        Ok(TaskPoll {
            status: task_status,
            image_url: json["image_url"]
                .as_str()
                .or_else(|| json["result"]["url"].as_str())
                .map(|s| s.to_string()),
            error: json["error"]["message"].as_str().map(|s| s.to_string()),
        })
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::from_status(
                resp.status().as_u16(),
                format!("image download failed for {}", url),
            ));
        }
        Ok(resp.bytes().await?)
    }
}
