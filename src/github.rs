use anyhow::Context as _;
use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use crate::formats::{
    DocumentMetadata, DocumentSource, NormalizedDocument, PersistedDocument, Section,
};

pub const DOC_TYPE_GITHUB: &str = "github_documentation";

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Pulls top-level `.md`/`.rst` files from a repository branch via the
/// REST contents API and emits one document per file.
pub struct GitHubExtractor {
    client: reqwest::Client,
    api_base: Url,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    size: u64,
    html_url: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    content: String,
    encoding: String,
}

impl GitHubExtractor {
    pub fn new(access_token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|err| anyhow::anyhow!("build github client: {err}"))?;
        let api_base = Url::parse(DEFAULT_API_BASE).context("parse github api base")?;
        Ok(Self {
            client,
            api_base,
            access_token,
        })
    }

    /// Points the extractor at a different API host. Used by tests.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub async fn extract_repo_content(
        &self,
        repo_name: &str,
        branch: &str,
    ) -> anyhow::Result<Vec<PersistedDocument>> {
        let mut list_url = self
            .api_base
            .join(&format!("repos/{repo_name}/contents/"))
            .with_context(|| format!("build contents url for {repo_name}"))?;
        list_url.query_pairs_mut().append_pair("ref", branch);

        let entries: Vec<ContentEntry> = self
            .get_json(&list_url)
            .await
            .with_context(|| format!("list contents of {repo_name}@{branch}"))?;

        let mut documents = Vec::new();
        for entry in entries {
            if entry.entry_type != "file" || !is_documentation_file(&entry.name) {
                continue;
            }
            match self.fetch_file(&entry, repo_name, branch).await {
                Ok(document) => documents.push(document),
                Err(err) => {
                    tracing::warn!(path = %entry.path, ?err, "file extraction failed; skipping");
                }
            }
        }
        Ok(documents)
    }

    async fn fetch_file(
        &self,
        entry: &ContentEntry,
        repo_name: &str,
        branch: &str,
    ) -> anyhow::Result<PersistedDocument> {
        let file_url = Url::parse(&entry.url)
            .with_context(|| format!("parse content url: {}", entry.url))?;
        let file: FileContent = self
            .get_json(&file_url)
            .await
            .with_context(|| format!("fetch file content: {}", entry.path))?;

        if file.encoding != "base64" {
            anyhow::bail!("unexpected content encoding: {}", file.encoding);
        }
        let body = decode_base64_content(&file.content)
            .with_context(|| format!("decode file content: {}", entry.path))?;

        Ok(assemble_file_document(entry, repo_name, branch, body))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> anyhow::Result<T> {
        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, "docrag/0.1")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("github api returned {status} for {url}");
        }
        response
            .json()
            .await
            .with_context(|| format!("parse json from {url}"))
    }
}

fn is_documentation_file(name: &str) -> bool {
    name.ends_with(".md") || name.ends_with(".rst")
}

/// GitHub base64 payloads are line-wrapped; strip the whitespace before
/// decoding.
fn decode_base64_content(content: &str) -> anyhow::Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .context("base64 decode")?;
    String::from_utf8(bytes).context("decode utf-8")
}

fn assemble_file_document(
    entry: &ContentEntry,
    repo_name: &str,
    branch: &str,
    body: String,
) -> PersistedDocument {
    let now = chrono::Utc::now().to_rfc3339();
    let subdomain = repo_name
        .rsplit('/')
        .next()
        .unwrap_or(repo_name)
        .to_owned();

    PersistedDocument {
        id: uuid::Uuid::new_v4().to_string(),
        doc_type: DOC_TYPE_GITHUB.to_owned(),
        subdomain,
        source: DocumentSource {
            url: entry.html_url.clone(),
            version: branch.to_owned(),
            last_updated: now.clone(),
        },
        content: NormalizedDocument {
            title: entry.name.clone(),
            sections: vec![Section {
                heading: entry.path.clone(),
                body,
                platform_variants: Default::default(),
            }],
            code_blocks: Vec::new(),
        },
        metadata: DocumentMetadata {
            crawl_timestamp: now,
            reading_time_minutes: 1,
            content_length: entry.size as usize,
            code_block_count: 0,
        },
        processed_for_embeddings: false,
    }
}
