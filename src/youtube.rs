use anyhow::Context as _;
use serde::Deserialize;
use url::Url;

use crate::formats::{
    DocumentMetadata, DocumentSource, NormalizedDocument, PersistedDocument, Section,
};

pub const DOC_TYPE_YOUTUBE: &str = "youtube_content";

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
const PAGE_SIZE: u32 = 50;

/// Pages through a playlist's items and emits one document per video,
/// with the description as the body.
pub struct YouTubeExtractor {
    client: reqwest::Client,
    api_base: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    snippet: Snippet,
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    description: String,
    channel_title: String,
    published_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    video_id: String,
}

impl YouTubeExtractor {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|err| anyhow::anyhow!("build youtube client: {err}"))?;
        let api_base = Url::parse(DEFAULT_API_BASE).context("parse youtube api base")?;
        Ok(Self {
            client,
            api_base,
            api_key,
        })
    }

    /// Points the extractor at a different API host. Used by tests.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub async fn extract_playlist_videos(
        &self,
        subdomain: &str,
        playlist_id: &str,
    ) -> anyhow::Result<Vec<PersistedDocument>> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(playlist_id, page_token.as_deref())
                .await
                .with_context(|| format!("fetch playlist page: {playlist_id}"))?;

            for item in page.items {
                videos.push(assemble_video_document(&item, subdomain, playlist_id));
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(videos)
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> anyhow::Result<PlaylistItemsResponse> {
        let mut url = self
            .api_base
            .join("playlistItems")
            .context("build playlistItems url")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("part", "snippet,contentDetails");
            query.append_pair("playlistId", playlist_id);
            query.append_pair("maxResults", &PAGE_SIZE.to_string());
            query.append_pair("key", &self.api_key);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("youtube api returned {status} for playlist {playlist_id}");
        }
        response
            .json()
            .await
            .context("parse playlistItems response")
    }
}

fn assemble_video_document(
    item: &PlaylistItem,
    subdomain: &str,
    playlist_id: &str,
) -> PersistedDocument {
    let now = chrono::Utc::now().to_rfc3339();
    let description = item.snippet.description.trim().to_owned();

    PersistedDocument {
        id: uuid::Uuid::new_v4().to_string(),
        doc_type: DOC_TYPE_YOUTUBE.to_owned(),
        subdomain: subdomain.to_owned(),
        source: DocumentSource {
            url: format!(
                "https://www.youtube.com/watch?v={}",
                item.content_details.video_id
            ),
            version: playlist_id.to_owned(),
            last_updated: item.snippet.published_at.clone(),
        },
        content: NormalizedDocument {
            title: item.snippet.title.clone(),
            sections: if description.is_empty() {
                Vec::new()
            } else {
                vec![Section {
                    heading: item.snippet.channel_title.clone(),
                    body: description.clone(),
                    platform_variants: Default::default(),
                }]
            },
            code_blocks: Vec::new(),
        },
        metadata: DocumentMetadata {
            crawl_timestamp: now,
            reading_time_minutes: 1,
            content_length: description.len(),
            code_block_count: 0,
        },
        processed_for_embeddings: false,
    }
}
