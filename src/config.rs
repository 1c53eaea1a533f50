use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// One documentation site to crawl: section entry pages joined onto the
/// base URL, tagged with a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSource {
    pub base_url: String,
    pub sections: Vec<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepoSource {
    pub name: String,
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeChannelSource {
    pub playlists: Vec<String>,
}

/// The sources file, keyed by subdomain tag. An unreadable or invalid
/// file aborts startup; running with no effective config is worse than
/// not running.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub documentation: BTreeMap<String, DocSource>,
    #[serde(default)]
    pub github_repos: BTreeMap<String, Vec<GitHubRepoSource>>,
    #[serde(default)]
    pub youtube_playlists: BTreeMap<String, Vec<YouTubeChannelSource>>,
}

impl SourcesConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read sources config: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("parse sources config: {}", path.display()))?;
        if config.documentation.is_empty()
            && config.github_repos.is_empty()
            && config.youtube_playlists.is_empty()
        {
            anyhow::bail!("sources config lists no sources: {}", path.display());
        }
        Ok(config)
    }
}

/// API credentials for the media extractors, kept out of the sources
/// file. Either entry may be absent; the matching extractor then runs
/// unauthenticated (GitHub) or is skipped (YouTube).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub github: Option<GitHubKeys>,
    #[serde(default)]
    pub youtube: Option<YouTubeKeys>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubKeys {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeKeys {
    pub api_key: String,
}

impl ApiKeys {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read api keys: {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parse api keys: {}", path.display()))
    }
}
