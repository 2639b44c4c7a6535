use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, TutorError};

/// Results requested from, and kept from, one search.
pub const MAX_VIDEO_RESULTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub title: String,
    pub link: String,
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Up to [`MAX_VIDEO_RESULTS`] videos in the index's own ranking order.
    async fn search(&self, query: &str) -> Result<Vec<VideoResult>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

/// YouTube Data API v3 search client.
pub struct VideoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    watch_host: String,
}

impl VideoClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.youtube_api_base.trim_end_matches('/').to_string(),
            api_key: config.youtube_api_key.clone(),
            watch_host: config.watch_host.clone(),
        })
    }
}

#[async_trait]
impl VideoSearch for VideoClient {
    async fn search(&self, query: &str) -> Result<Vec<VideoResult>> {
        if query.trim().is_empty() {
            return Err(TutorError::VideoUpstream("empty search query".to_string()));
        }

        let max_results = MAX_VIDEO_RESULTS.to_string();
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("type", "video"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TutorError::VideoUpstream(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TutorError::VideoUpstream(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(TutorError::VideoUpstream(format!("HTTP {status}: {body}")));
        }

        let videos = parse_search_response(&body, &self.watch_host)?;
        info!(query, count = videos.len(), "Video search complete");
        Ok(videos)
    }
}

/// Turn a search response body into ranked video links.
pub fn parse_search_response(body: &str, watch_host: &str) -> Result<Vec<VideoResult>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| TutorError::VideoUpstream(format!("malformed search response: {e}")))?;

    let videos = response
        .items
        .into_iter()
        .filter_map(|item| match item.id.video_id {
            Some(id) => Some(VideoResult {
                title: item.snippet.title,
                link: watch_link(watch_host, &id),
            }),
            None => {
                debug!(title = %item.snippet.title, "Skipping search item without videoId");
                None
            }
        })
        .take(MAX_VIDEO_RESULTS)
        .collect();

    Ok(videos)
}

pub fn watch_link(host: &str, video_id: &str) -> String {
    format!("https://{}/watch?v={}", host, video_id)
}
