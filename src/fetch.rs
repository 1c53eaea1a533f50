use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::normalize::RawPage;

/// Fetch failures are distinguishable from "fetched but empty" so the
/// crawl loop can decide whether a URL is worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("empty body for {url}")]
    EmptyBody { url: String },
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError>;
}

/// Plain HTTP fetcher. A rendering (headless-browser) fetcher would slot
/// in behind the same trait; the normalizer does not care how the HTML
/// was obtained.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| anyhow::anyhow!("build http client: {err}"))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, "docrag/0.1")
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        if html.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(RawPage {
            url: final_url,
            html,
        })
    }
}
