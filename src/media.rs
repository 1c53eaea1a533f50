use anyhow::Context as _;

use crate::cli::MediaArgs;
use crate::config::{ApiKeys, SourcesConfig};
use crate::github::GitHubExtractor;
use crate::store::{DocumentStore, JsonlStore};
use crate::youtube::YouTubeExtractor;

/// Runs the media side of the ETL: GitHub repository docs and YouTube
/// playlist metadata, stored alongside the crawled documentation.
pub async fn run(args: MediaArgs) -> anyhow::Result<()> {
    let config = SourcesConfig::load(&args.config).context("load sources config")?;
    let keys = match &args.keys {
        Some(path) => ApiKeys::load(path).context("load api keys")?,
        None => ApiKeys::default(),
    };

    let mut store = JsonlStore::open(&args.store)
        .with_context(|| format!("open document store: {}", args.store))?;

    process_github_repos(&config, &keys, &mut store).await?;
    process_youtube_playlists(&config, &keys, &mut store).await?;

    let stats = store.statistics();
    tracing::info!(total_documents = stats.total_documents, "media etl finished");
    Ok(())
}

async fn process_github_repos(
    config: &SourcesConfig,
    keys: &ApiKeys,
    store: &mut dyn DocumentStore,
) -> anyhow::Result<()> {
    if config.github_repos.is_empty() {
        return Ok(());
    }

    let token = keys.github.as_ref().map(|g| g.access_token.clone());
    let extractor = GitHubExtractor::new(token).context("build github extractor")?;

    for repos in config.github_repos.values() {
        for repo in repos {
            tracing::info!(repo = %repo.name, "processing repo");
            for branch in &repo.branches {
                let documents = match extractor.extract_repo_content(&repo.name, branch).await {
                    Ok(documents) => documents,
                    Err(err) => {
                        tracing::error!(repo = %repo.name, branch, ?err, "repo extraction failed");
                        continue;
                    }
                };
                for document in documents {
                    let url = document.source.url.clone();
                    if store.insert(document)? {
                        tracing::info!(%url, "stored document");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn process_youtube_playlists(
    config: &SourcesConfig,
    keys: &ApiKeys,
    store: &mut dyn DocumentStore,
) -> anyhow::Result<()> {
    if config.youtube_playlists.is_empty() {
        return Ok(());
    }

    let Some(youtube) = &keys.youtube else {
        tracing::warn!("youtube playlists configured but no api key provided; skipping");
        return Ok(());
    };
    let extractor =
        YouTubeExtractor::new(youtube.api_key.clone()).context("build youtube extractor")?;

    for (subdomain, channels) in &config.youtube_playlists {
        for channel in channels {
            for playlist_id in &channel.playlists {
                let videos = match extractor
                    .extract_playlist_videos(subdomain, playlist_id)
                    .await
                {
                    Ok(videos) => videos,
                    Err(err) => {
                        tracing::error!(playlist_id, ?err, "playlist extraction failed");
                        continue;
                    }
                };
                for video in videos {
                    let url = video.source.url.clone();
                    if store.insert(video)? {
                        tracing::info!(%url, "stored video");
                    }
                }
            }
        }
    }
    Ok(())
}
