use std::collections::HashSet;

use anyhow::Context as _;
use url::Url;

use crate::assemble::assemble;
use crate::cli::CrawlArgs;
use crate::config::{DocSource, SourcesConfig};
use crate::fetch::Fetcher;
use crate::normalize::Normalizer;
use crate::store::DocumentStore;

#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlOutcome {
    pub pages_fetched: usize,
    pub documents_stored: usize,
    pub duplicates_skipped: usize,
    pub pages_skipped: usize,
    pub fetch_failures: usize,
}

pub async fn run(args: CrawlArgs) -> anyhow::Result<()> {
    let config = SourcesConfig::load(&args.config).context("load sources config")?;
    if config.documentation.is_empty() {
        anyhow::bail!("sources config has no documentation sources: {}", args.config);
    }

    let mut store = crate::store::JsonlStore::open(&args.store)
        .with_context(|| format!("open document store: {}", args.store))?;
    let fetcher = crate::fetch::HttpFetcher::new().context("build fetcher")?;
    let normalizer = Normalizer::new();

    for (subdomain, source) in &config.documentation {
        tracing::info!(subdomain, base_url = %source.base_url, "starting extraction");

        // The visited set is scoped to this invocation, not the crawler.
        let mut visited = HashSet::new();
        let outcome = crawl_subdomain(
            &fetcher,
            &normalizer,
            &mut store,
            subdomain,
            source,
            &mut visited,
        )
        .await?;

        tracing::info!(
            subdomain,
            pages_fetched = outcome.pages_fetched,
            documents_stored = outcome.documents_stored,
            duplicates_skipped = outcome.duplicates_skipped,
            pages_skipped = outcome.pages_skipped,
            fetch_failures = outcome.fetch_failures,
            "subdomain extraction finished"
        );
    }

    let stats = store.statistics();
    tracing::info!(total_documents = stats.total_documents, "crawl finished");
    Ok(())
}

/// Crawls one configured documentation subdomain: each section entry page
/// plus every same-host page it links to, each URL at most once per
/// invocation. Per-page failures are logged and skipped; only a bad
/// base URL (a configuration error) is fatal.
pub async fn crawl_subdomain(
    fetcher: &dyn Fetcher,
    normalizer: &Normalizer,
    store: &mut dyn DocumentStore,
    subdomain: &str,
    source: &DocSource,
    visited: &mut HashSet<String>,
) -> anyhow::Result<CrawlOutcome> {
    let base_url = Url::parse(&source.base_url)
        .with_context(|| format!("parse base url: {}", source.base_url))?;

    let mut outcome = CrawlOutcome::default();

    for section in &source.sections {
        let section_url = match section_url(&base_url, section) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(section, ?err, "unresolvable section entry; skipping");
                continue;
            }
        };

        if !visited.insert(section_url.to_string()) {
            continue;
        }

        let page = match fetcher.fetch(&section_url).await {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(url = %section_url, %err, "section fetch failed; skipping");
                outcome.fetch_failures += 1;
                continue;
            }
        };
        outcome.pages_fetched += 1;

        let links = normalizer.discover_links(&page, &base_url);
        tracing::info!(section, links = links.len(), "discovered section links");

        process_page(normalizer, store, subdomain, source, &page, &mut outcome)?;

        for link in links {
            if !visited.insert(link.to_string()) {
                continue;
            }

            let page = match fetcher.fetch(&link).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(url = %link, %err, "page fetch failed; skipping");
                    outcome.fetch_failures += 1;
                    continue;
                }
            };
            outcome.pages_fetched += 1;

            process_page(normalizer, store, subdomain, source, &page, &mut outcome)?;
        }
    }

    Ok(outcome)
}

fn process_page(
    normalizer: &Normalizer,
    store: &mut dyn DocumentStore,
    subdomain: &str,
    source: &DocSource,
    page: &crate::normalize::RawPage,
    outcome: &mut CrawlOutcome,
) -> anyhow::Result<()> {
    let Some(normalized) = normalizer.normalize(page) else {
        outcome.pages_skipped += 1;
        return Ok(());
    };

    if store.exists(page.url.as_str()) {
        outcome.duplicates_skipped += 1;
        return Ok(());
    }

    let document = assemble(normalized.document, &page.url, subdomain, &source.version);
    if store.insert(document)? {
        outcome.documents_stored += 1;
        tracing::info!(url = %page.url, "stored document");
    } else {
        outcome.duplicates_skipped += 1;
    }
    Ok(())
}

/// Joins a section entry name onto the base URL the way the sources file
/// expects: relative to the base directory, not to its last segment.
fn section_url(base_url: &Url, section: &str) -> anyhow::Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(section)
        .with_context(|| format!("join section onto base: {section}"))
}
