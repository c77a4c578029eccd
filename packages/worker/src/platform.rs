//! Writes descriptions to the video platform.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::error::PlatformError;

#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Replace the description of video `external_id`, leaving its other
    /// metadata untouched.
    async fn update_description(
        &self,
        external_id: &str,
        description: &str,
    ) -> Result<(), PlatformError>;
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Deserialize)]
struct VideoResource {
    snippet: Value,
}

/// YouTube Data API v3 client.
///
/// The API replaces the whole snippet on update, so the current snippet is
/// fetched first and sent back with only the description changed.
pub struct YoutubeClient {
    http: Client,
    api_base: String,
    access_token: String,
}

impl YoutubeClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn videos_url(&self) -> String {
        format!("{}/videos", self.api_base)
    }

    async fn fetch_snippet(&self, external_id: &str) -> Result<Value, PlatformError> {
        let res = self
            .http
            .get(self.videos_url())
            .query(&[("part", "snippet"), ("id", external_id)])
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let res = check_status(res).await?;

        let list: VideoListResponse = res.json().await?;
        list.items
            .into_iter()
            .next()
            .map(|video| video.snippet)
            .ok_or_else(|| PlatformError::VideoNotFound(external_id.to_string()))
    }
}

#[async_trait]
impl VideoPlatform for YoutubeClient {
    async fn update_description(
        &self,
        external_id: &str,
        description: &str,
    ) -> Result<(), PlatformError> {
        let mut snippet = self.fetch_snippet(external_id).await?;
        let Some(fields) = snippet.as_object_mut() else {
            return Err(PlatformError::InvalidResponse(
                "video snippet is not an object".into(),
            ));
        };
        fields.insert("description".into(), Value::String(description.to_string()));

        let res = self
            .http
            .put(self.videos_url())
            .query(&[("part", "snippet")])
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "id": external_id, "snippet": snippet }))
            .send()
            .await?;
        check_status(res).await?;

        debug!(external_id, "Description updated on platform");
        Ok(())
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(PlatformError::Status {
        status: status.as_u16(),
        body,
    })
}
