use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    docrag::logging::init().context("init logging")?;

    let cli = docrag::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        docrag::cli::Command::Crawl(args) => {
            docrag::crawl::run(args).await.context("crawl")?;
        }
        docrag::cli::Command::Media(args) => {
            docrag::media::run(args).await.context("media")?;
        }
        docrag::cli::Command::Embed(args) => {
            docrag::features::run(args).await.context("embed")?;
        }
        docrag::cli::Command::Search(args) => {
            docrag::features::search(args).await.context("search")?;
        }
        docrag::cli::Command::Export(args) => {
            docrag::export::run(args).context("export")?;
        }
        docrag::cli::Command::Stats(args) => {
            docrag::stats::run(args).context("stats")?;
        }
    }

    Ok(())
}
