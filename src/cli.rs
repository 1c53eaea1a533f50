use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl configured documentation sites into the document store.
    Crawl(CrawlArgs),
    /// Pull GitHub repository docs and YouTube playlist metadata.
    Media(MediaArgs),
    /// Chunk and embed unprocessed documents into the vector index.
    Embed(EmbedArgs),
    /// Retrieve the stored chunks closest to a query.
    Search(SearchArgs),
    /// Dump stored documents as per-subdomain text files.
    Export(ExportArgs),
    /// Print corpus statistics.
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Sources config file (YAML).
    #[arg(long)]
    pub config: String,

    /// Document store file (JSONL), created if absent.
    #[arg(long)]
    pub store: String,
}

#[derive(Debug, Args)]
pub struct MediaArgs {
    /// Sources config file (YAML).
    #[arg(long)]
    pub config: String,

    /// API keys file (YAML). Optional; GitHub then runs unauthenticated
    /// and YouTube playlists are skipped.
    #[arg(long)]
    pub keys: Option<String>,

    /// Document store file (JSONL), created if absent.
    #[arg(long)]
    pub store: String,
}

#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// Document store file (JSONL).
    #[arg(long)]
    pub store: String,

    /// Vector index file (JSONL), created if absent.
    #[arg(long)]
    pub vectors: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Vector index file (JSONL).
    #[arg(long)]
    pub vectors: String,

    /// Query text.
    #[arg(long)]
    pub query: String,

    /// Maximum number of hits to print.
    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Document store file (JSONL).
    #[arg(long)]
    pub store: String,

    /// Output directory for exported text files.
    #[arg(long)]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Document store file (JSONL).
    #[arg(long)]
    pub store: String,
}
